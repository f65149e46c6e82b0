//! 下载目标
//!
//! 浏览器里是 Blob + `<a download>`，本地是写文件，测试里是内存。

use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::utils::write_file;

/// 一次待投递的文件下载
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime_type: &'static str,
    pub contents: Vec<u8>,
}

impl Download {
    /// 以 UTF-8 解释内容
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}

/// 接收下载的目标环境
pub trait DownloadSink {
    fn deliver(&mut self, download: Download) -> Result<(), ExportError>;
}

impl<S: DownloadSink + ?Sized> DownloadSink for &mut S {
    fn deliver(&mut self, download: Download) -> Result<(), ExportError> {
        (**self).deliver(download)
    }
}

/// `None` 表示没有可用的下载环境，投递静默跳过
impl<S: DownloadSink> DownloadSink for Option<S> {
    fn deliver(&mut self, download: Download) -> Result<(), ExportError> {
        match self {
            Some(sink) => sink.deliver(download),
            None => {
                tracing::debug!(
                    filename = %download.filename,
                    "no download environment, dropping file"
                );
                Ok(())
            }
        }
    }
}

/// 把下载写入目录
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 文件名只取最后一段，避免写出目录之外
    pub fn path_for(&self, filename: &str) -> Option<PathBuf> {
        let name = Path::new(filename).file_name()?;
        Some(self.dir.join(name))
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, download: Download) -> Result<(), ExportError> {
        let path = self.path_for(&download.filename).ok_or_else(|| {
            ExportError::Backend(format!("invalid download filename: {:?}", download.filename))
        })?;

        write_file(&path, &download.contents)?;
        tracing::info!(path = %path.display(), bytes = download.contents.len(), "download written");
        Ok(())
    }
}

/// 在内存中收集下载
#[derive(Debug, Default)]
pub struct MemorySink {
    pub downloads: Vec<Download>,
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, download: Download) -> Result<(), ExportError> {
        self.downloads.push(download);
        Ok(())
    }
}
