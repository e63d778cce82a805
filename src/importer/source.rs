// ==========================================
// 实体导入系统 - 数据源实现
// ==========================================
// 支持: CSV (.csv) / JSON (.json) / 数据库表 / 内存记录
// 来源: 文件路径 / HTTP 地址 / 内联内容
// ==========================================

use crate::domain::{FieldValue, Predicate, RawRecord, SourceKey};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::EntityStore;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// HTTP 拉取超时
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ==========================================
// Source Trait
// ==========================================
// 用途: 产出有序的源记录序列（一次性全部读取）
// 实现者: CsvSource, JsonSource, TableSource, MemorySource
pub trait Source: Send + Sync {
    /// 数据源名称（日志 / 钩子上下文使用）
    fn name(&self) -> String;

    /// 读取全部源记录（保持源顺序）
    fn get_records(&self) -> ImportResult<Vec<RawRecord>>;
}

// ==========================================
// SourceOrigin - 内容来源
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOrigin {
    File(PathBuf),
    /// 远程地址（GET 拉取响应正文）
    Http(String),
    Content(String),
}

impl SourceOrigin {
    fn read(&self) -> ImportResult<String> {
        match self {
            SourceOrigin::File(path) => {
                // 检查文件存在
                if !path.exists() {
                    return Err(ImportError::FileNotFound(path.display().to_string()));
                }
                Ok(std::fs::read_to_string(path)?)
            }
            SourceOrigin::Http(url) => fetch_url(url),
            SourceOrigin::Content(content) => Ok(content.clone()),
        }
    }

    fn describe(&self) -> String {
        match self {
            SourceOrigin::File(path) => path.display().to_string(),
            SourceOrigin::Http(url) => url.clone(),
            SourceOrigin::Content(_) => "inline".to_string(),
        }
    }
}

/// 拉取远程内容，非 2xx 状态视为失败
fn fetch_url(url: &str) -> ImportResult<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(ImportError::HttpError(format!("{} 返回状态 {}", url, status)));
    }

    let body = response.text()?;
    debug!(url = %url, bytes = body.len(), "远程内容拉取完成");
    Ok(body)
}

// ==========================================
// CSV Source 实现
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvSource {
    origin: SourceOrigin,
    delimiter: u8,
    has_header_row: bool,
    skip_empty_rows: bool,
}

impl CsvSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::new(SourceOrigin::File(path.as_ref().to_path_buf()))
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(SourceOrigin::Http(url.into()))
    }

    pub fn from_content(content: impl Into<String>) -> Self {
        Self::new(SourceOrigin::Content(content.into()))
    }

    fn new(origin: SourceOrigin) -> Self {
        Self {
            origin,
            delimiter: b',',
            has_header_row: true,
            skip_empty_rows: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// 首行是否为表头（否则按列位置索引）
    pub fn with_header_row(mut self, has_header_row: bool) -> Self {
        self.has_header_row = has_header_row;
        self
    }

    pub fn with_skip_empty_rows(mut self, skip: bool) -> Self {
        self.skip_empty_rows = skip;
        self
    }

    fn read_rows(&self) -> ImportResult<Vec<Vec<String>>> {
        let content = self.origin.read()?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .flexible(true) // 允许行长度不一致
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.trim().to_string()).collect());
        }
        Ok(rows)
    }

    /// 表头行
    ///
    /// - 有表头: 表头单元格
    /// - 无表头: 首行各列的位置索引
    pub fn heading_line(&self) -> ImportResult<Vec<String>> {
        let rows = self.read_rows()?;
        let first = match rows.into_iter().next() {
            Some(row) => row,
            None => return Ok(Vec::new()),
        };

        if self.has_header_row {
            Ok(first)
        } else {
            Ok((0..first.len()).map(|idx| idx.to_string()).collect())
        }
    }

    /// 字段映射可选项 (源字段标识, 展示标签)
    ///
    /// - 有表头: ("email", "email [2]")
    /// - 无表头: ("2", "[2]")
    pub fn field_options(&self) -> ImportResult<Vec<(String, String)>> {
        let heading = self.heading_line()?;
        Ok(heading
            .into_iter()
            .enumerate()
            .map(|(idx, field)| {
                if self.has_header_row {
                    let label = format!("{} [{}]", field, idx);
                    (field, label)
                } else {
                    (idx.to_string(), format!("[{}]", idx))
                }
            })
            .collect())
    }

    /// 前 n 行原始文本（预览用）
    pub fn preview_lines(&self, n: usize) -> ImportResult<String> {
        let content = self.origin.read()?;
        Ok(content.lines().take(n).collect::<Vec<_>>().join("\n"))
    }
}

impl Source for CsvSource {
    fn name(&self) -> String {
        format!("csv:{}", self.origin.describe())
    }

    fn get_records(&self) -> ImportResult<Vec<RawRecord>> {
        let mut rows = self.read_rows()?.into_iter();

        // 读取表头
        let headers: Option<Vec<String>> = if self.has_header_row {
            match rows.next() {
                Some(header) => Some(header),
                None => return Ok(Vec::new()),
            }
        } else {
            None
        };

        let mut records = Vec::new();
        for row in rows {
            let mut values = HashMap::new();

            for (col_idx, value) in row.into_iter().enumerate() {
                let key = match &headers {
                    Some(headers) => match headers.get(col_idx) {
                        Some(header) => SourceKey::Name(header.clone()),
                        // 超出表头的列忽略
                        None => continue,
                    },
                    None => SourceKey::Index(col_idx),
                };
                values.insert(key, FieldValue::Text(value));
            }

            let record = RawRecord::new(values);

            // 跳过完全空白的行
            if self.skip_empty_rows && record.is_blank() {
                continue;
            }

            records.push(record);
        }

        Ok(records)
    }
}

// ==========================================
// JSON Source 实现
// ==========================================
#[derive(Debug, Clone)]
pub struct JsonSource {
    origin: SourceOrigin,
    data_path: Option<String>,
}

impl JsonSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            origin: SourceOrigin::File(path.as_ref().to_path_buf()),
            data_path: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            origin: SourceOrigin::Http(url.into()),
            data_path: None,
        }
    }

    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            origin: SourceOrigin::Content(content.into()),
            data_path: None,
        }
    }

    /// 记录数组所在路径（点分隔，例如 "data.items"）
    pub fn with_data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// 原始文件内容
    pub fn file_content(&self) -> ImportResult<String> {
        self.origin.read()
    }
}

impl Source for JsonSource {
    fn name(&self) -> String {
        format!("json:{}", self.origin.describe())
    }

    fn get_records(&self) -> ImportResult<Vec<RawRecord>> {
        let content = self.origin.read()?;
        let root: serde_json::Value = serde_json::from_str(&content)?;

        let mut node = &root;
        if let Some(path) = self.data_path.as_deref().filter(|p| !p.trim().is_empty()) {
            for segment in path.split('.') {
                node = node.get(segment).ok_or_else(|| {
                    ImportError::JsonParseError(format!("路径 {} 不存在", path))
                })?;
            }
        }

        let items = node
            .as_array()
            .ok_or_else(|| ImportError::JsonParseError("记录节点不是数组".to_string()))?;

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let object = item.as_object().ok_or_else(|| {
                ImportError::JsonParseError(format!("第 {} 个元素不是对象", idx + 1))
            })?;
            let mut values = HashMap::new();
            flatten_object("", object, &mut values);
            records.push(RawRecord::new(values));
        }

        Ok(records)
    }
}

/// 展开嵌套对象：{"a": {"b": 1}} → "a" (JSON 文本) + "a.b" (1)
fn flatten_object(
    prefix: &str,
    object: &serde_json::Map<String, serde_json::Value>,
    out: &mut HashMap<SourceKey, FieldValue>,
) {
    for (key, value) in object {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        out.insert(SourceKey::Name(full_key.clone()), FieldValue::from_json(value));
        if let serde_json::Value::Object(nested) = value {
            flatten_object(&full_key, nested, out);
        }
    }
}

// ==========================================
// 数据库表数据源
// ==========================================
// 读取同库另一张表的行（按主键升序），列名即源字段名
pub struct TableSource<S: EntityStore> {
    store: S,
    table: String,
    filter: Predicate,
}

impl<S: EntityStore> TableSource<S> {
    pub fn new(store: S, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            filter: Predicate::All,
        }
    }

    /// 只读取满足条件的行
    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }
}

impl<S: EntityStore + Send + Sync> Source for TableSource<S> {
    fn name(&self) -> String {
        format!("table:{}", self.table)
    }

    fn get_records(&self) -> ImportResult<Vec<RawRecord>> {
        if !self.store.table_exists(&self.table)? {
            return Err(ImportError::TableNotFound(self.table.clone()));
        }

        let rows = self.store.find_many(&self.table, &self.filter)?;
        Ok(rows
            .into_iter()
            .map(|row| RawRecord::from_pairs(row.values))
            .collect())
    }
}

// ==========================================
// 内存数据源
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    records: Vec<RawRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            name: "memory".to_string(),
            records,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Source for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn get_records(&self) -> ImportResult<Vec<RawRecord>> {
        Ok(self.records.clone())
    }
}

// ==========================================
// 按扩展名选择数据源
// ==========================================
pub fn source_from_path<P: AsRef<Path>>(path: P) -> ImportResult<Box<dyn Source>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => Ok(Box::new(CsvSource::from_path(path))),
        "json" => Ok(Box::new(JsonSource::from_path(path))),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

/// 按地址路径的扩展名选择远程数据源（忽略查询串与片段）
pub fn source_from_url(url: &str) -> ImportResult<Box<dyn Source>> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    };

    match ext.as_str() {
        "csv" => Ok(Box::new(CsvSource::from_url(url))),
        "json" => Ok(Box::new(JsonSource::from_url(url))),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

/// 是否为 HTTP(S) 地址
pub fn is_http_location(location: &str) -> bool {
    let lower = location.trim_start().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// 文件路径或 HTTP 地址
pub fn source_from_location(location: &str) -> ImportResult<Box<dyn Source>> {
    if is_http_location(location) {
        source_from_url(location)
    } else {
        source_from_path(location)
    }
}
