//! 浏览器后端测试
//!
//! 运行：`wasm-pack test --headless --chrome -- --features browser --test browser`

#![cfg(all(target_arch = "wasm32", feature = "browser"))]

use audit_kit::audit::{CREATED_PRODUCTS_KEY, FIXED_MISMATCHES_KEY};
use audit_kit::browser::{browser_audit_memory, BrowserDownload, LocalStorage};
use audit_kit::{download_csv, AuditMemory, KeyValueStore, Record};
use serde_json::json;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn fresh_memory() -> AuditMemory<LocalStorage> {
    let mut memory = browser_audit_memory();
    memory.clear();
    memory
}

#[wasm_bindgen_test]
fn test_local_storage_round_trip() {
    let mut storage = LocalStorage::new().expect("localStorage available");
    storage.set("audit-kit-test", "value").unwrap();
    assert_eq!(storage.get("audit-kit-test").unwrap().as_deref(), Some("value"));

    storage.remove("audit-kit-test").unwrap();
    assert_eq!(storage.get("audit-kit-test").unwrap(), None);
}

#[wasm_bindgen_test]
fn test_audit_memory_persists_in_local_storage() {
    let mut memory = fresh_memory();
    assert!(memory.is_available());

    memory.mark_mismatch_as_fixed("SKU1", "price");
    memory.mark_product_as_created("blue-mug");

    // 新实例从同一个 localStorage 读取
    let reopened = browser_audit_memory();
    assert!(reopened.is_mismatch_fixed("SKU1", "price"));
    assert!(reopened.is_product_created("blue-mug"));

    let storage = LocalStorage::new().unwrap();
    assert_eq!(
        storage.get(FIXED_MISMATCHES_KEY).unwrap().as_deref(),
        Some(r#"["SKU1-price"]"#)
    );

    memory.clear();
    assert_eq!(storage.get(FIXED_MISMATCHES_KEY).unwrap(), None);
    assert_eq!(storage.get(CREATED_PRODUCTS_KEY).unwrap(), None);
    assert!(memory.fixed_mismatches().is_empty());
}

#[wasm_bindgen_test]
fn test_corrupt_local_storage_reads_empty() {
    let mut memory = fresh_memory();
    let mut storage = LocalStorage::new().unwrap();
    storage.set(CREATED_PRODUCTS_KEY, "{not json").unwrap();

    assert!(memory.created_product_handles().is_empty());
    memory.mark_product_as_created("a");
    assert_eq!(
        storage.get(CREATED_PRODUCTS_KEY).unwrap().as_deref(),
        Some(r#"["a"]"#)
    );
    memory.clear();
}

#[wasm_bindgen_test]
fn test_browser_download_cleans_up_anchor() {
    let document = web_sys::window().unwrap().document().unwrap();
    let body = document.body().unwrap();
    let before = body.child_element_count();

    let record: Record = match json!({"sku": "SKU1", "price": 10.5}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let records = vec![record];
    let mut sink = BrowserDownload::new().expect("document available");
    download_csv(Some(records.as_slice()), "report.csv", &mut sink).unwrap();

    // 临时 <a> 已移除
    assert_eq!(body.child_element_count(), before);
}
