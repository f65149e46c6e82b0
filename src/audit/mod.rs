//! 审计记忆模块
//!
//! 记住用户已处理的条目（已修复差异、已创建商品），避免重新标记

pub mod memory;
pub mod store;

// 重导出
pub use memory::*;
pub use store::*;
