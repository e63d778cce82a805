// ==========================================
// 实体导入系统 - 导入运行器
// ==========================================
// 流程: 读取源 → 运行前钩子 → 预检 → 清空 → 逐条处理 → 运行后钩子 → 汇总
// 逐条: 映射 → 单条前钩子 → 新增/合并 → 派生字段 → 单条后钩子
// 约束:
// - 单线程顺序执行，每条处理完成后才进入下一条
// - 任一错误中止整次运行；已提交的记录不回滚
// - 试运行只读不写（清空、写入、派生字段全部跳过）
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::{ImportConfig, PersistedRecord, RawRecord, SortingMode};
use crate::importer::clock::{Clock, SystemClock};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::hooks::{HookContext, HookRegistry, ImportHook, ItemDecision};
use crate::importer::post_processor::PostProcessor;
use crate::importer::reconciler::Reconciler;
use crate::importer::report::{ReportMessage, ReportSink, TracingReportSink};
use crate::importer::source::Source;
use crate::importer::template::{PlaceholderResolver, TemplateResolver};
use crate::repository::EntityStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 运行状态
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    Fetching,
    /// index: 当前记录下标（0 起）
    Processing { index: usize },
    Completed,
    Aborted { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// 没有任何记录被处理
    Empty,
    Failed,
}

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// 被单条前钩子跳过
    Skipped,
    /// 已落库并完成派生字段
    Persisted {
        record: PersistedRecord,
        was_insert: bool,
    },
    /// 试运行：只做了查找
    Validated {
        record: Option<PersistedRecord>,
        was_insert: bool,
    },
}

impl ItemOutcome {
    pub fn record(&self) -> Option<&PersistedRecord> {
        match self {
            ItemOutcome::Skipped => None,
            ItemOutcome::Persisted { record, .. } => Some(record),
            ItemOutcome::Validated { record, .. } => record.as_ref(),
        }
    }

    pub fn was_insert(&self) -> Option<bool> {
        match self {
            ItemOutcome::Skipped => None,
            ItemOutcome::Persisted { was_insert, .. } | ItemOutcome::Validated { was_insert, .. } => {
                Some(*was_insert)
            }
        }
    }
}

/// 运行汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    /// 已处理（未被跳过）的记录数
    pub total_count: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub dry_run: bool,
}

impl RunSummary {
    pub fn new(run_id: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: run_id.into(),
            total_count: 0,
            inserted: 0,
            updated: 0,
            skipped: 0,
            status: RunStatus::Empty,
            error_message: None,
            dry_run,
        }
    }

    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome.was_insert() {
            None => self.skipped += 1,
            Some(true) => {
                self.total_count += 1;
                self.inserted += 1;
            }
            Some(false) => {
                self.total_count += 1;
                self.updated += 1;
            }
        }
    }

    fn finish(&mut self) {
        self.status = if self.total_count > 0 {
            RunStatus::Success
        } else {
            RunStatus::Empty
        };
    }

    fn fail(&mut self, error: &ImportError) {
        self.status = RunStatus::Failed;
        self.error_message = Some(error.to_string());
    }
}

#[derive(Debug)]
pub enum RunResult {
    Completed(RunSummary),
    Aborted { error: ImportError, summary: RunSummary },
}

impl RunResult {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunResult::Completed(summary) | RunResult::Aborted { summary, .. } => summary,
        }
    }

    pub fn error(&self) -> Option<&ImportError> {
        match self {
            RunResult::Completed(_) => None,
            RunResult::Aborted { error, .. } => Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunResult::Completed(_))
    }

    pub fn into_result(self) -> ImportResult<RunSummary> {
        match self {
            RunResult::Completed(summary) => Ok(summary),
            RunResult::Aborted { error, .. } => Err(error),
        }
    }
}

// ==========================================
// ImportRunner
// ==========================================
pub struct ImportRunner<S: EntityStore> {
    store: S,
    hooks: HookRegistry,
    resolver: Arc<dyn TemplateResolver>,
    clock: Arc<dyn Clock>,
    report_sink: Arc<dyn ReportSink>,
    state: Mutex<RunState>,
}

impl<S: EntityStore> ImportRunner<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            hooks: HookRegistry::new(),
            resolver: Arc::new(PlaceholderResolver::new()),
            clock: Arc::new(SystemClock),
            report_sink: Arc::new(TracingReportSink),
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ImportHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TemplateResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// 派生时间字段使用的时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = sink;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 最近一次运行的状态
    pub fn state(&self) -> RunState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_state(&self, next: RunState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// 执行一次导入
    ///
    /// # 参数
    /// - config: 导入配置
    /// - source: 数据源
    /// - dry_run: 试运行（不提交任何写入）
    ///
    /// # 返回
    /// - Completed: 正常结束（含无数据）
    /// - Aborted: 中止，summary 中保留中止前已处理的条数
    #[instrument(skip(self, config, source), fields(table = %config.target_table, mode = %config.import_mode, run_id = tracing::field::Empty))]
    pub fn run(&self, config: &ImportConfig, source: &dyn Source, dry_run: bool) -> RunResult {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        info!(source = %source.name(), dry_run = dry_run, "开始导入");

        let mut summary = RunSummary::new(run_id, dry_run);
        let outcome = self.execute(config, source, dry_run, &mut summary);

        let result = match outcome {
            Ok(()) => {
                summary.finish();
                self.set_state(RunState::Completed);
                info!(
                    total = summary.total_count,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    "导入完成"
                );
                RunResult::Completed(summary)
            }
            Err(error) => {
                summary.fail(&error);
                self.set_state(RunState::Aborted {
                    error: error.to_string(),
                });
                warn!(processed = summary.total_count, error = %error, "导入中止");
                RunResult::Aborted { error, summary }
            }
        };

        self.report_sink
            .report(ReportMessage::from_summary(result.summary()));
        result
    }

    /// 按配置 ID 读取配置后执行
    pub fn run_stored<C: ImportConfigReader + ?Sized>(
        &self,
        reader: &C,
        config_id: &str,
        source: &dyn Source,
        dry_run: bool,
    ) -> ImportResult<RunResult> {
        let config = reader.import_config(config_id)?;
        Ok(self.run(&config, source, dry_run))
    }

    fn execute(
        &self,
        config: &ImportConfig,
        source: &dyn Source,
        dry_run: bool,
        summary: &mut RunSummary,
    ) -> ImportResult<()> {
        // ===== 1. 读取源记录 =====
        self.set_state(RunState::Fetching);
        let fetched = source.get_records()?;
        debug!(count = fetched.len(), "源记录读取完成");

        let run_id = summary.run_id.clone();
        let ctx = HookContext {
            config,
            source,
            dry_run,
            run_id: &run_id,
        };

        // ===== 2. 运行前钩子 =====
        let items = self.hooks.before_run(fetched.clone(), &ctx);

        // ===== 3. 预检（任何写入之前） =====
        config.validate()?;
        let reconciler = Reconciler::for_table(&self.store, &config.target_table)?;
        reconciler.validate_columns(required_columns(config))?;

        // ===== 4. 导入前清空 =====
        if config.purge_applies() {
            reconciler.purge(config.purge_filter.as_ref(), dry_run)?;
        }

        // ===== 5. 逐条处理 =====
        let mapper = FieldMapper::new(self.resolver.clone());
        let post_processor =
            PostProcessor::new(&self.store, &config.target_table).with_clock(self.clock.clone());

        for (index, raw) in items.iter().enumerate() {
            self.set_state(RunState::Processing { index });
            let outcome = self.process_item(
                config,
                raw,
                index + 1,
                summary.total_count + 1,
                &mapper,
                &reconciler,
                &post_processor,
                &ctx,
            )?;
            summary.record(&outcome);
        }

        // ===== 6. 运行后钩子 =====
        self.hooks.after_run(&fetched, &ctx);
        Ok(())
    }

    /// 处理单条记录
    ///
    /// # 参数
    /// - row_number: 源中的序号（错误信息用）
    /// - position: 已处理序号（排序值用，跳过的记录不占位）
    #[allow(clippy::too_many_arguments)]
    fn process_item(
        &self,
        config: &ImportConfig,
        raw: &RawRecord,
        row_number: usize,
        position: usize,
        mapper: &FieldMapper,
        reconciler: &Reconciler<'_, S>,
        post_processor: &PostProcessor<'_, S>,
        ctx: &HookContext<'_>,
    ) -> ImportResult<ItemOutcome> {
        let mapped = mapper.map(raw, &config.field_mapping, row_number)?;

        if self.hooks.before_item(&mapped, raw, ctx) == ItemDecision::Skip {
            debug!(row = row_number, "单条前钩子跳过记录");
            return Ok(ItemOutcome::Skipped);
        }

        let reconciliation = reconciler.reconcile(
            config.import_mode,
            &mapped,
            &config.merge_identifier_fields,
            ctx.dry_run,
        )?;

        let outcome = match (ctx.dry_run, reconciliation.record) {
            (false, Some(mut record)) => {
                post_processor.process(config, &mut record, position)?;
                ItemOutcome::Persisted {
                    record,
                    was_insert: reconciliation.was_insert,
                }
            }
            (_, record) => ItemOutcome::Validated {
                record,
                was_insert: reconciliation.was_insert,
            },
        };
        debug!(row = row_number, insert = ?outcome.was_insert(), "记录处理完成");

        self.hooks.after_item(outcome.record(), &mapped, raw, ctx);
        Ok(outcome)
    }
}

/// 目标表必须具备的列: 映射目标列 + 合并查找列 + 已开启的派生字段
fn required_columns(config: &ImportConfig) -> Vec<&str> {
    let mut columns = config.mapped_columns();
    columns.extend(
        config
            .merge_identifier_fields
            .iter()
            .map(|identifier| identifier.target.as_str()),
    );

    let derived = [
        (config.set_date_added, config.date_added_field.as_deref()),
        (config.set_tstamp, config.tstamp_field.as_deref()),
        (config.generate_alias, config.alias_field.as_deref()),
    ];
    columns.extend(
        derived
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .filter_map(|(_, field)| field.map(str::trim))
            .filter(|field| !field.is_empty()),
    );

    if config.sorting_mode == SortingMode::SourceOrder {
        columns.push(config.effective_sorting_field());
    }

    columns.sort_unstable();
    columns.dedup();
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldMappingRule, ImportMode, MergeIdentifier};

    #[test]
    fn test_required_columns() {
        let mut config = ImportConfig::new("tl_news", ImportMode::Merge);
        config.field_mapping = vec![
            FieldMappingRule::source("headline", "title"),
            FieldMappingRule::source("email", "mail"),
        ];
        config.merge_identifier_fields = vec![MergeIdentifier::new("email", "email")];
        config.set_tstamp = true;
        config.tstamp_field = Some("tstamp".to_string());
        config.set_date_added = false;
        config.date_added_field = Some("dateAdded".to_string());
        config.sorting_mode = SortingMode::SourceOrder;

        assert_eq!(
            required_columns(&config),
            vec!["email", "headline", "sorting", "tstamp"]
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new("r", false);
        summary.record(&ItemOutcome::Skipped);
        summary.finish();
        assert_eq!(summary.status, RunStatus::Empty);
        assert_eq!(summary.skipped, 1);

        summary.record(&ItemOutcome::Validated {
            record: None,
            was_insert: true,
        });
        summary.finish();
        assert_eq!(summary.status, RunStatus::Success);
        assert_eq!((summary.total_count, summary.inserted), (1, 1));
    }
}
