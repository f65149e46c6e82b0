// Workspace Root Finder
// 向上查找包含 .audit 目录的工作区

use std::path::{Path, PathBuf};

/// 工作区标记目录
pub const WORKSPACE_DIR: &str = ".audit";

/// 最多向上查找的层数
const MAX_DEPTH: usize = 10;

/// 从指定目录向上遍历，返回第一个包含 `.audit` 目录的祖先
pub fn find_workspace_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_DEPTH)
        .find(|dir| dir.join(WORKSPACE_DIR).is_dir())
        .map(Path::to_path_buf)
}
