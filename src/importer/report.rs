// ==========================================
// 实体导入系统 - 运行结果通知
// ==========================================
// 职责: 每次运行恰好一条汇总消息（成功 / 无数据 / 中止）
// 文本: 经 rust-i18n 按当前语言渲染，key 与语言无关
// ==========================================

use crate::i18n;
use crate::importer::runner::{RunStatus, RunSummary};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info};

pub const KEY_SUCCESSFUL: &str = "import.successful";
pub const KEY_EMPTY: &str = "import.empty";
pub const KEY_FAILED: &str = "import.failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    Confirmation,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMessage {
    pub level: ReportLevel,
    pub key: String,
    pub text: String,
}

impl ReportMessage {
    /// 由运行汇总生成通知
    pub fn from_summary(summary: &RunSummary) -> Self {
        let count = summary.total_count.to_string();
        let (level, key, mut text) = match summary.status {
            RunStatus::Success => (
                ReportLevel::Confirmation,
                KEY_SUCCESSFUL,
                i18n::t_with_args(KEY_SUCCESSFUL, &[("count", &count)]),
            ),
            RunStatus::Empty => (ReportLevel::Info, KEY_EMPTY, i18n::t(KEY_EMPTY)),
            RunStatus::Failed => {
                let cause = summary.error_message.as_deref().unwrap_or_default();
                (
                    ReportLevel::Error,
                    KEY_FAILED,
                    i18n::t_with_args(KEY_FAILED, &[("count", &count), ("error", cause)]),
                )
            }
        };

        if summary.dry_run {
            text = format!("{} ({})", text, i18n::t("import.dry_run"));
        }

        Self {
            level,
            key: key.to_string(),
            text,
        }
    }
}

// ==========================================
// ReportSink Trait
// ==========================================
pub trait ReportSink: Send + Sync {
    fn report(&self, message: ReportMessage);
}

/// 写入 tracing 日志（默认）
#[derive(Debug, Clone, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn report(&self, message: ReportMessage) {
        match message.level {
            ReportLevel::Error => error!(key = %message.key, "{}", message.text),
            ReportLevel::Confirmation | ReportLevel::Info => {
                info!(key = %message.key, "{}", message.text)
            }
        }
    }
}

/// 收集到内存（测试 / 嵌入调用方读取）
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    messages: Mutex<Vec<ReportMessage>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ReportMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ReportSink for MemoryReportSink {
    fn report(&self, message: ReportMessage) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}
