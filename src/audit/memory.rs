// Audit Memory
// 已修复的差异与已创建的商品，跨会话持久化

use std::collections::BTreeSet;

use super::store::KeyValueStore;

/// 已修复差异集合的存储键
pub const FIXED_MISMATCHES_KEY: &str = "fixedMismatches";

/// 已创建商品 handle 集合的存储键
pub const CREATED_PRODUCTS_KEY: &str = "createdProducts";

/// 差异键：`{identifier}-{field}`
pub fn mismatch_key(identifier: &str, field: &str) -> String {
    format!("{}-{}", identifier, field)
}

/// 解析持久化的字符串数组
///
/// 只接受 JSON 字符串数组；其他内容视为损坏。
pub fn parse_string_set(raw: &str) -> Result<BTreeSet<String>, serde_json::Error> {
    let items: Vec<String> = serde_json::from_str(raw)?;
    Ok(items.into_iter().collect())
}

/// 审计记忆
///
/// 存储不可用（`None`）时读取返回空集合，写入静默跳过。
/// 所有操作都不会向调用方返回错误：损坏的数据读作空集合，
/// 写入失败只记录日志。
#[derive(Debug)]
pub struct AuditMemory<S> {
    store: Option<S>,
}

impl<S: KeyValueStore> AuditMemory<S> {
    pub fn new(store: S) -> Self {
        Self { store: Some(store) }
    }

    /// 没有持久化存储的环境
    pub fn unavailable() -> Self {
        Self { store: None }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    pub fn into_store(self) -> Option<S> {
        self.store
    }

    pub fn fixed_mismatches(&self) -> BTreeSet<String> {
        self.read_set(FIXED_MISMATCHES_KEY)
    }

    pub fn mark_mismatch_as_fixed(&mut self, identifier: &str, field: &str) {
        self.add_to_set(FIXED_MISMATCHES_KEY, mismatch_key(identifier, field));
    }

    pub fn is_mismatch_fixed(&self, identifier: &str, field: &str) -> bool {
        self.fixed_mismatches()
            .contains(&mismatch_key(identifier, field))
    }

    pub fn created_product_handles(&self) -> BTreeSet<String> {
        self.read_set(CREATED_PRODUCTS_KEY)
    }

    pub fn mark_product_as_created(&mut self, handle: &str) {
        self.add_to_set(CREATED_PRODUCTS_KEY, handle.to_string());
    }

    pub fn is_product_created(&self, handle: &str) -> bool {
        self.created_product_handles().contains(handle)
    }

    /// 删除两个集合，可重复调用
    pub fn clear(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };

        for key in [FIXED_MISMATCHES_KEY, CREATED_PRODUCTS_KEY] {
            if let Err(e) = store.remove(key) {
                tracing::warn!(key, error = %e, "failed to clear audit memory entry");
            }
        }
    }

    fn read_set(&self, key: &str) -> BTreeSet<String> {
        let Some(store) = self.store.as_ref() else {
            return BTreeSet::new();
        };

        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeSet::new(),
            Err(e) => {
                tracing::debug!(key, error = %e, "audit memory unreadable, treating as empty");
                return BTreeSet::new();
            }
        };

        parse_string_set(&raw).unwrap_or_else(|e| {
            tracing::debug!(key, error = %e, "malformed audit memory, treating as empty");
            BTreeSet::new()
        })
    }

    /// 读-改-写整个集合；非原子，假定单一调用方
    fn add_to_set(&mut self, key: &str, item: String) {
        if self.store.is_none() {
            return;
        }

        let mut set = self.read_set(key);
        set.insert(item);

        let json = match serde_json::to_string(&set) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode audit memory");
                return;
            }
        };

        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.set(key, &json) {
                tracing::warn!(key, error = %e, "failed to persist audit memory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::store::{JsonFileStore, MemoryStore};
    use crate::error::StoreError;
    use tempfile::TempDir;

    fn memory() -> AuditMemory<MemoryStore> {
        AuditMemory::new(MemoryStore::new())
    }

    #[test]
    fn test_mark_mismatch_as_fixed() {
        let mut audit = memory();
        audit.mark_mismatch_as_fixed("SKU1", "price");

        let fixed = audit.fixed_mismatches();
        assert_eq!(fixed.len(), 1);
        assert!(fixed.contains("SKU1-price"));
        assert!(audit.is_mismatch_fixed("SKU1", "price"));
        assert!(!audit.is_mismatch_fixed("SKU1", "title"));
    }

    #[test]
    fn test_mark_twice_is_idempotent() {
        let mut audit = memory();
        audit.mark_mismatch_as_fixed("SKU1", "price");
        audit.mark_mismatch_as_fixed("SKU1", "price");
        assert_eq!(audit.fixed_mismatches().len(), 1);
    }

    #[test]
    fn test_created_products_independent_of_mismatches() {
        let mut audit = memory();
        audit.mark_product_as_created("blue-mug");
        audit.mark_product_as_created("red-mug");

        assert_eq!(audit.created_product_handles().len(), 2);
        assert!(audit.is_product_created("blue-mug"));
        assert!(audit.fixed_mismatches().is_empty());
    }

    #[test]
    fn test_clear_empties_both_sets() {
        let mut audit = memory();
        audit.mark_mismatch_as_fixed("SKU1", "price");
        audit.mark_product_as_created("blue-mug");

        audit.clear();
        assert!(audit.fixed_mismatches().is_empty());
        assert!(audit.created_product_handles().is_empty());
        assert!(audit.store().unwrap().is_empty());

        // 再次清除不报错
        audit.clear();
    }

    #[test]
    fn test_persisted_layout_is_json_array() {
        let mut audit = memory();
        audit.mark_mismatch_as_fixed("SKU2", "title");
        audit.mark_mismatch_as_fixed("SKU1", "price");

        let raw = audit.store().unwrap().get(FIXED_MISMATCHES_KEY).unwrap().unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["SKU1-price", "SKU2-title"]);
    }

    #[test]
    fn test_malformed_data_reads_as_empty() {
        let mut store = MemoryStore::new();
        store.set(FIXED_MISMATCHES_KEY, "not json").unwrap();
        store.set(CREATED_PRODUCTS_KEY, "not json").unwrap();
        let audit = AuditMemory::new(store);

        assert!(audit.fixed_mismatches().is_empty());
        assert!(audit.created_product_handles().is_empty());
    }

    #[test]
    fn test_non_array_payloads_read_as_empty() {
        for raw in [r#"{"a": 1}"#, "42", r#"[1, 2]"#, "null"] {
            let mut store = MemoryStore::new();
            store.set(CREATED_PRODUCTS_KEY, raw).unwrap();
            let audit = AuditMemory::new(store);
            assert!(audit.created_product_handles().is_empty(), "payload {}", raw);
        }
    }

    #[test]
    fn test_malformed_data_self_heals_on_write() {
        let mut store = MemoryStore::new();
        store.set(FIXED_MISMATCHES_KEY, "not json").unwrap();
        let mut audit = AuditMemory::new(store);

        audit.mark_mismatch_as_fixed("SKU1", "price");
        assert_eq!(audit.fixed_mismatches().len(), 1);
    }

    #[test]
    fn test_unavailable_storage() {
        let mut audit: AuditMemory<MemoryStore> = AuditMemory::unavailable();
        assert!(!audit.is_available());

        audit.mark_mismatch_as_fixed("SKU1", "price");
        audit.mark_product_as_created("blue-mug");
        audit.clear();

        assert!(audit.fixed_mismatches().is_empty());
        assert!(audit.created_product_handles().is_empty());
    }

    /// 所有操作都失败的存储
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("quota exceeded".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("quota exceeded".to_string()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_backend_errors_are_not_surfaced() {
        let mut audit = AuditMemory::new(BrokenStore);
        audit.mark_mismatch_as_fixed("SKU1", "price");
        audit.clear();
        assert!(audit.fixed_mismatches().is_empty());
    }

    #[test]
    fn test_file_backed_memory_survives_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memory.json");

        {
            let mut audit = AuditMemory::new(JsonFileStore::new(&path));
            audit.mark_mismatch_as_fixed("SKU1", "price");
            audit.mark_product_as_created("blue-mug");
        }

        let audit = AuditMemory::new(JsonFileStore::new(&path));
        assert!(audit.is_mismatch_fixed("SKU1", "price"));
        assert!(audit.is_product_created("blue-mug"));
    }

    #[test]
    fn test_parse_string_set() {
        let set = parse_string_set(r#"["b", "a", "b"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert!(parse_string_set("not json").is_err());
    }
}
