//! 工具模块
//!
//! 提供 JSON、文件系统、工作区查找等常用工具函数

pub mod fs;
pub mod json;
pub mod project_root;

// 重导出
pub use fs::*;
pub use json::*;
pub use project_root::*;
