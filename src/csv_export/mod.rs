//! CSV 导出
//!
//! 表头取自第一条记录的字段顺序，后续记录按表头取值。
//! 默认转义策略与旧版前端保持一致：只有含逗号的单元格加引号。

mod sink;

pub use sink::{DirectorySink, Download, DownloadSink, MemorySink};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::ExportError;

/// CSV 下载的 MIME 类型
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8;";

/// 一条记录：字段名 → 标量值（保持插入顺序）
pub type Record = serde_json::Map<String, Value>;

/// 单元格转义策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvEscaping {
    /// 含逗号的单元格加双引号；不转义引号和换行，表头原样输出
    #[default]
    Compatible,
    /// RFC 4180：含逗号、引号、换行的单元格加引号，内部引号加倍
    Rfc4180,
}

/// 按固定转义策略导出记录
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter {
    pub escaping: CsvEscaping,
}

impl CsvExporter {
    pub fn new(escaping: CsvEscaping) -> Self {
        Self { escaping }
    }

    /// 生成 CSV 文本；空序列返回 None
    pub fn render(&self, records: &[Record]) -> Option<String> {
        let first = records.first()?;
        let headers: Vec<&str> = first.keys().map(String::as_str).collect();

        let mut lines = Vec::with_capacity(records.len() + 1);
        lines.push(
            headers
                .iter()
                .map(|h| self.escape_header(h))
                .collect::<Vec<_>>()
                .join(","),
        );

        for record in records {
            let row: Vec<String> = headers
                .iter()
                .map(|h| self.escape_cell(&cell_text(record.get(*h))))
                .collect();
            lines.push(row.join(","));
        }

        Some(lines.join("\n"))
    }

    /// 生成 CSV 并交给下载目标；记录为空时什么都不做
    pub fn download<S>(
        &self,
        records: Option<&[Record]>,
        filename: &str,
        sink: &mut S,
    ) -> Result<(), ExportError>
    where
        S: DownloadSink + ?Sized,
    {
        let Some(csv) = records.and_then(|r| self.render(r)) else {
            tracing::debug!(filename, "no records to export, skipping download");
            return Ok(());
        };

        sink.deliver(Download {
            filename: filename.to_string(),
            mime_type: CSV_MIME_TYPE,
            contents: csv.into_bytes(),
        })
    }

    fn escape_header(&self, header: &str) -> String {
        match self.escaping {
            CsvEscaping::Compatible => header.to_string(),
            CsvEscaping::Rfc4180 => self.escape_cell(header),
        }
    }

    fn escape_cell(&self, text: &str) -> String {
        match self.escaping {
            CsvEscaping::Compatible => {
                if text.contains(',') {
                    format!("\"{}\"", text)
                } else {
                    text.to_string()
                }
            }
            CsvEscaping::Rfc4180 => {
                if text.contains([',', '"', '\n', '\r']) {
                    format!("\"{}\"", text.replace('"', "\"\""))
                } else {
                    text.to_string()
                }
            }
        }
    }
}

/// 以默认转义策略生成 CSV 文本
pub fn to_csv(records: &[Record]) -> Option<String> {
    CsvExporter::default().render(records)
}

/// 以默认转义策略生成 CSV 并下载
pub fn download_csv<S>(
    records: Option<&[Record]>,
    filename: &str,
    sink: &mut S,
) -> Result<(), ExportError>
where
    S: DownloadSink + ?Sized,
{
    CsvExporter::default().download(records, filename, sink)
}

/// 把可序列化的结构体转换为记录，字段顺序与声明顺序一致
pub fn records_from_serialize<T: Serialize>(items: &[T]) -> Result<Vec<Record>, ExportError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| -> Result<Record, ExportError> {
            match serde_json::to_value(item)? {
                Value::Object(map) => Ok(map),
                _ => Err(ExportError::NotARecord { index }),
            }
        })
        .collect()
}

/// 解析 JSON 数组形式的记录
pub fn records_from_json(json: &str) -> Result<Vec<Record>, ExportError> {
    let values: Vec<Value> = serde_json::from_str(json)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(map) => Ok(map),
            _ => Err(ExportError::NotARecord { index }),
        })
        .collect()
}

/// 单元格文本：null / 缺失为空，其余按通用字符串转换
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => number_text(n),
        Some(other) => other.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) => float_text(f),
        None => n.to_string(),
    }
}

/// 浮点数按 JavaScript `String(n)` 的规则输出：
/// 十进制指数在 [-6, 20] 内用定点写法（`3.0` → `3`），其余用 `1e+21` / `1e-7` 形式
fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }

    // `{:e}` 给出能往返的最短有效数字
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exp.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat(n.unsigned_abs() as usize), digits)
    } else {
        let (first, rest) = digits.split_at(1);
        let e = n - 1;
        let sign = if e < 0 { '-' } else { '+' };
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, e.abs())
        }
    };

    if f < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}
