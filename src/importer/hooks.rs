// ==========================================
// 实体导入系统 - 导入生命周期钩子
// ==========================================
// 职责: 定义钩子 trait 与注册表
// 触发点: 运行前 / 单条前 / 单条后 / 运行后
// 约束: 同步调用，按注册顺序执行；无全局事件总线
// ==========================================

use crate::domain::{ImportConfig, MappedRecord, PersistedRecord, RawRecord};
use crate::importer::source::Source;
use std::sync::Arc;
use tracing::debug;

// ==========================================
// 钩子上下文
// ==========================================

/// 钩子调用时可见的运行信息
pub struct HookContext<'a> {
    pub config: &'a ImportConfig,
    pub source: &'a dyn Source,
    pub dry_run: bool,
    pub run_id: &'a str,
}

/// 单条前钩子的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemDecision {
    #[default]
    Continue,
    Skip,
}

// ==========================================
// ImportHook Trait
// ==========================================

/// 导入钩子
///
/// 所有方法均有空实现，按需覆盖
pub trait ImportHook: Send + Sync {
    /// 运行前：可替换整批记录（过滤 / 补充）
    fn on_before_run(&self, items: Vec<RawRecord>, _ctx: &HookContext<'_>) -> Vec<RawRecord> {
        items
    }

    /// 单条前：返回 Skip 则该条不计数、不落库
    fn on_before_item(
        &self,
        _mapped: &MappedRecord,
        _raw: &RawRecord,
        _ctx: &HookContext<'_>,
    ) -> ItemDecision {
        ItemDecision::Continue
    }

    /// 单条后：record 在试运行中可能为空
    fn on_after_item(
        &self,
        _record: Option<&PersistedRecord>,
        _mapped: &MappedRecord,
        _raw: &RawRecord,
        _ctx: &HookContext<'_>,
    ) {
    }

    /// 运行后：传入钩子替换前的原始记录
    fn on_after_run(&self, _items: &[RawRecord], _ctx: &HookContext<'_>) {}
}

// ==========================================
// HookRegistry
// ==========================================

/// 钩子注册表（保持注册顺序）
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn ImportHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn ImportHook>) {
        self.hooks.push(hook);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// 记录列表依次经过每个钩子
    pub fn before_run(&self, items: Vec<RawRecord>, ctx: &HookContext<'_>) -> Vec<RawRecord> {
        let before = items.len();
        let items = self
            .hooks
            .iter()
            .fold(items, |items, hook| hook.on_before_run(items, ctx));
        if items.len() != before {
            debug!(before = before, after = items.len(), "运行前钩子调整了记录列表");
        }
        items
    }

    /// 所有钩子都会被调用；任一返回 Skip 即跳过
    pub fn before_item(
        &self,
        mapped: &MappedRecord,
        raw: &RawRecord,
        ctx: &HookContext<'_>,
    ) -> ItemDecision {
        let mut decision = ItemDecision::Continue;
        for hook in &self.hooks {
            if hook.on_before_item(mapped, raw, ctx) == ItemDecision::Skip {
                decision = ItemDecision::Skip;
            }
        }
        decision
    }

    pub fn after_item(
        &self,
        record: Option<&PersistedRecord>,
        mapped: &MappedRecord,
        raw: &RawRecord,
        ctx: &HookContext<'_>,
    ) {
        for hook in &self.hooks {
            hook.on_after_item(record, mapped, raw, ctx);
        }
    }

    pub fn after_run(&self, items: &[RawRecord], ctx: &HookContext<'_>) {
        for hook in &self.hooks {
            hook.on_after_run(items, ctx);
        }
    }
}
