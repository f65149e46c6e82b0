//! 浏览器后端：localStorage 与 DOM 触发下载
//!
//! 只在 wasm32 + `browser` feature 下编译。没有 window/document 时
//! 构造函数返回 None，交给 `AuditMemory::unavailable` 或
//! `Option<S>` 下载目标处理。

use js_sys::Array;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Storage, Url};

use crate::audit::{AuditMemory, KeyValueStore};
use crate::csv_export::{Download, DownloadSink};
use crate::error::{ExportError, StoreError};

fn js_error(value: JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

/// `window.localStorage`
pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    pub fn new() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;
        Some(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage
            .get_item(key)
            .map_err(|e| StoreError::Backend(js_error(e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StoreError::Backend(js_error(e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StoreError::Backend(js_error(e)))
    }
}

/// 基于 localStorage 的审计记忆；没有浏览器环境时为不可用状态
pub fn browser_audit_memory() -> AuditMemory<LocalStorage> {
    match LocalStorage::new() {
        Some(storage) => AuditMemory::new(storage),
        None => AuditMemory::unavailable(),
    }
}

/// Blob + 临时 `<a download>` 元素
pub struct BrowserDownload {
    document: web_sys::Document,
}

impl BrowserDownload {
    pub fn new() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self { document })
    }

    fn trigger(&self, download: &Download) -> Result<(), JsValue> {
        let text = String::from_utf8_lossy(&download.contents);
        let parts = Array::of1(&JsValue::from_str(&text));

        let options = BlobPropertyBag::new();
        options.set_type(download.mime_type);
        let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
        let url = Url::create_object_url_with_blob(&blob)?;

        let anchor: HtmlAnchorElement = self.document.create_element("a")?.dyn_into()?;
        anchor.set_href(&url);
        anchor.set_download(&download.filename);

        let body = self
            .document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(&anchor)?;
        anchor.click();
        body.remove_child(&anchor)?;

        Url::revoke_object_url(&url)
    }
}

impl DownloadSink for BrowserDownload {
    fn deliver(&mut self, download: Download) -> Result<(), ExportError> {
        self.trigger(&download)
            .map_err(|e| ExportError::Backend(js_error(e)))
    }
}
