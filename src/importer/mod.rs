// ==========================================
// 实体导入系统 - 导入层
// ==========================================
// 职责: 从数据源读取记录，映射后写入目标表
// 流程: Source → FieldMapper → Reconciler → PostProcessor
// 编排: ImportRunner（钩子 / 试运行 / 汇总通知）
// ==========================================

// 模块声明
pub mod clock;
pub mod error;
pub mod field_mapper;
pub mod hooks;
pub mod post_processor;
pub mod reconciler;
pub mod report;
pub mod runner;
pub mod source;
pub mod template;

// 重导出核心类型
pub use clock::{Clock, SteppingClock, SystemClock};
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use hooks::{HookContext, HookRegistry, ImportHook, ItemDecision};
pub use post_processor::{PostProcessor, SORTING_SPACING};
pub use reconciler::{Reconciler, Reconciliation};
pub use report::{MemoryReportSink, ReportLevel, ReportMessage, ReportSink, TracingReportSink};
pub use runner::{ImportRunner, ItemOutcome, RunResult, RunState, RunStatus, RunSummary};
pub use source::{
    is_http_location, source_from_location, source_from_path, source_from_url, CsvSource,
    JsonSource, MemorySource, Source, SourceOrigin, TableSource,
};
pub use template::{PlaceholderResolver, TemplateResolver};
