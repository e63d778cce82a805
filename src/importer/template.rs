// ==========================================
// 实体导入系统 - 静态值模板替换
// ==========================================
// 标记格式:
// - {{name}}          变量表中的值
// - {{source::key}}   当前源记录的字段值
// - {{date}}          当前日期 (%Y-%m-%d)
// - {{date::FMT}}     当前时间按 chrono 格式输出
// 未识别的标记原样保留
// ==========================================

use crate::domain::RawRecord;
use crate::importer::clock::{Clock, SystemClock};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

// ==========================================
// TemplateResolver Trait
// ==========================================
pub trait TemplateResolver: Send + Sync {
    /// 解析模板中的替换标记
    fn resolve(&self, template: &str, raw: &RawRecord) -> String;
}

// ==========================================
// PlaceholderResolver
// ==========================================
pub struct PlaceholderResolver {
    variables: HashMap<String, String>,
    clock: Arc<dyn Clock>,
}

impl Default for PlaceholderResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderResolver {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 非法格式返回 None（标记原样保留）
    fn format_now(&self, format: &str) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", self.clock.now_local().format(format)).ok()?;
        Some(out)
    }

    fn resolve_token(&self, token: &str, raw: &RawRecord) -> Option<String> {
        let token = token.trim();
        match token.split_once("::") {
            Some(("source", key)) => raw.get(key).map(|v| v.to_string()),
            Some(("date", format)) => self.format_now(format),
            Some(_) => None,
            None if token == "date" => self.format_now("%Y-%m-%d"),
            None => self.variables.get(token).cloned(),
        }
    }
}

impl TemplateResolver for PlaceholderResolver {
    fn resolve(&self, template: &str, raw: &RawRecord) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];

            match after_open.find("}}") {
                Some(end) => {
                    let token = &after_open[..end];
                    match self.resolve_token(token, raw) {
                        Some(value) => result.push_str(&value),
                        None => {
                            result.push_str("{{");
                            result.push_str(token);
                            result.push_str("}}");
                        }
                    }
                    rest = &after_open[end + 2..];
                }
                None => {
                    // 没有闭合标记
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }
}
