// Audit Kit - Library Root
//
// 审计工作流的小工具：class 合并、CSV 导出、持久化审计记忆

pub mod audit;
pub mod class_names;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod utils;

#[cfg(all(target_arch = "wasm32", feature = "browser"))]
pub mod browser;

// 重新导出常用类型
pub use audit::{AuditMemory, JsonFileStore, KeyValueStore, MemoryStore};
pub use class_names::{class_list, merge_classes, ClassFragment};
pub use config::AuditConfig;
pub use csv_export::{download_csv, to_csv, CsvEscaping, CsvExporter, DownloadSink, Record};
pub use error::{ExportError, StoreError};
