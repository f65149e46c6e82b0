//! 配置
//!
//! 存储位置与导出目录的解析顺序：命令行参数 > 环境变量 >
//! 工作区（向上查找 `.audit`）> 用户数据目录 / 当前目录。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::csv_export::CsvEscaping;
use crate::utils::{find_workspace_root_from, read_json_or_default, WORKSPACE_DIR};

pub const STORE_ENV: &str = "AUDIT_KIT_STORE";
pub const EXPORT_DIR_ENV: &str = "AUDIT_KIT_EXPORT_DIR";

const STORE_FILE: &str = "memory.json";
const CONFIG_FILE: &str = "config.json";

/// `.audit/config.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    #[serde(default)]
    pub csv_escaping: CsvEscaping,
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

/// 解析后的配置
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub workspace_root: Option<PathBuf>,
    pub store_path: PathBuf,
    pub export_dir: PathBuf,
    pub csv_escaping: CsvEscaping,
}

impl AuditConfig {
    /// 从当前目录和进程环境解析
    pub fn resolve(overrides: &Overrides) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::resolve_from(&cwd, overrides, |key| std::env::var_os(key)))
    }

    /// 解析逻辑本体，环境变量通过闭包注入
    pub fn resolve_from<F>(cwd: &Path, overrides: &Overrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        let workspace_root = find_workspace_root_from(cwd);
        let settings: WorkspaceSettings = workspace_root
            .as_ref()
            .map(|root| read_json_or_default(&root.join(WORKSPACE_DIR).join(CONFIG_FILE)))
            .unwrap_or_default();

        let store_path = overrides
            .store
            .clone()
            .or_else(|| env(STORE_ENV).map(PathBuf::from))
            .or_else(|| {
                workspace_root
                    .as_ref()
                    .map(|root| root.join(WORKSPACE_DIR).join(STORE_FILE))
            })
            .unwrap_or_else(|| default_store_path(cwd));

        let export_dir = overrides
            .export_dir
            .clone()
            .or_else(|| env(EXPORT_DIR_ENV).map(PathBuf::from))
            .or_else(|| {
                let root = workspace_root.as_ref()?;
                Some(match &settings.export_dir {
                    Some(dir) => root.join(dir),
                    None => root.clone(),
                })
            })
            .unwrap_or_else(|| cwd.to_path_buf());

        tracing::debug!(
            store = %store_path.display(),
            export_dir = %export_dir.display(),
            "resolved audit config"
        );

        Self {
            workspace_root,
            store_path,
            export_dir,
            csv_escaping: settings.csv_escaping,
        }
    }
}

/// 无工作区时使用用户数据目录
fn default_store_path(cwd: &Path) -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("audit-kit"))
        .unwrap_or_else(|| cwd.join(WORKSPACE_DIR))
        .join(STORE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::write_file;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<OsString> {
        None
    }

    #[test]
    fn test_workspace_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".audit")).unwrap();
        let nested = temp.path().join("reports");
        std::fs::create_dir_all(&nested).unwrap();

        let config = AuditConfig::resolve_from(&nested, &Overrides::default(), no_env);
        assert_eq!(config.workspace_root.as_deref(), Some(temp.path()));
        assert_eq!(config.store_path, temp.path().join(".audit/memory.json"));
        assert_eq!(config.export_dir, temp.path());
        assert_eq!(config.csv_escaping, CsvEscaping::Compatible);
    }

    #[test]
    fn test_workspace_settings_file() {
        let temp = TempDir::new().unwrap();
        write_file(
            &temp.path().join(".audit/config.json"),
            r#"{"export_dir": "exports", "csv_escaping": "rfc4180"}"#,
        )
        .unwrap();

        let config = AuditConfig::resolve_from(temp.path(), &Overrides::default(), no_env);
        assert_eq!(config.export_dir, temp.path().join("exports"));
        assert_eq!(config.csv_escaping, CsvEscaping::Rfc4180);
    }

    #[test]
    fn test_env_beats_workspace_and_flags_beat_env() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".audit")).unwrap();

        let env = |key: &str| match key {
            STORE_ENV => Some(OsString::from("/tmp/env-store.json")),
            EXPORT_DIR_ENV => Some(OsString::from("/tmp/env-exports")),
            _ => None,
        };

        let config = AuditConfig::resolve_from(temp.path(), &Overrides::default(), env);
        assert_eq!(config.store_path, PathBuf::from("/tmp/env-store.json"));
        assert_eq!(config.export_dir, PathBuf::from("/tmp/env-exports"));

        let overrides = Overrides {
            store: Some(PathBuf::from("/tmp/flag-store.json")),
            export_dir: None,
        };
        let config = AuditConfig::resolve_from(temp.path(), &overrides, env);
        assert_eq!(config.store_path, PathBuf::from("/tmp/flag-store.json"));
        assert_eq!(config.export_dir, PathBuf::from("/tmp/env-exports"));
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join(".audit/config.json"), "{oops").unwrap();

        let config = AuditConfig::resolve_from(temp.path(), &Overrides::default(), no_env);
        assert_eq!(config.export_dir, temp.path());
        assert_eq!(config.csv_escaping, CsvEscaping::Compatible);
    }
}
