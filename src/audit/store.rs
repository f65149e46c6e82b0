//! 键值存储后端
//!
//! 与浏览器 localStorage 同样的能力：按字符串键读写删字符串值。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::utils::{read_file, remove_file_if_exists, write_json};

/// 同步字符串键值存储
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// 进程内存储
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// 单个 JSON 对象文件，`{"key": "value", ...}`
///
/// 每次操作都重新读取文件，多个进程共享时后写者覆盖先写者。
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = read_file(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// 写入前读取；文件损坏时从空表重建
    fn load_for_write(&self) -> BTreeMap<String, String> {
        self.load().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "store file unreadable, rebuilding");
            BTreeMap::new()
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load_for_write();
        entries.insert(key.to_string(), value.to_string());
        write_json(&self.path, &entries)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load_for_write();
        if entries.remove(key).is_none() {
            return Ok(());
        }

        if entries.is_empty() {
            remove_file_if_exists(&self.path)?;
        } else {
            write_json(&self.path, &entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // 删除不存在的键不报错
        store.remove("k").unwrap();
    }

    #[test]
    fn test_json_file_store_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".audit/memory.json");

        let mut store = JsonFileStore::new(&path);
        store.set("fixedMismatches", r#"["SKU1-price"]"#).unwrap();
        store.set("createdProducts", r#"["blue-mug"]"#).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("fixedMismatches").unwrap().as_deref(),
            Some(r#"["SKU1-price"]"#)
        );
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn test_json_file_store_remove_last_key_deletes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memory.json");

        let mut store = JsonFileStore::new(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        store.remove("a").unwrap();
        assert!(path.exists());
        store.remove("b").unwrap();
        assert!(!path.exists());
        store.remove("b").unwrap();
    }

    #[test]
    fn test_json_file_store_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memory.json");
        write_file(&path, "not json").unwrap();

        let mut store = JsonFileStore::new(&path);
        assert!(matches!(store.get("a"), Err(StoreError::Corrupt(_))));

        // 写入会从空表重建
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
