// ==========================================
// 实体导入系统 - 落库后字段派生
// ==========================================
// 职责: 创建时间 / 更新时间 / 别名 / 排序值
// 约束: 仅作用于真实落库的记录（试运行、跳过的记录不进入）
// 写入: 每个派生字段单独一次按 id 更新
// ==========================================

use crate::domain::{FieldValue, ImportConfig, MappedRecord, PersistedRecord, Predicate, SortingMode};
use crate::importer::clock::{Clock, SystemClock};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::EntityStore;
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// 排序值间隔（预留人工调整空间）
pub const SORTING_SPACING: i64 = 128;

fn alias_token_regex() -> ImportResult<&'static Regex> {
    static TOKEN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"%([A-Za-z0-9_.\-]+)%"))
        .as_ref()
        .map_err(|e| ImportError::InvalidConfig(format!("别名模板正则无效: {}", e)))
}

pub struct PostProcessor<'s, S: EntityStore + ?Sized> {
    store: &'s S,
    table: String,
    clock: Arc<dyn Clock>,
}

impl<'s, S: EntityStore + ?Sized> PostProcessor<'s, S> {
    pub fn new(store: &'s S, table: &str) -> Self {
        Self {
            store,
            table: table.to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 依次执行全部派生步骤
    ///
    /// # 参数
    /// - position: 记录在本次运行中的序号（1 起）
    pub fn process(
        &self,
        config: &ImportConfig,
        record: &mut PersistedRecord,
        position: usize,
    ) -> ImportResult<()> {
        self.set_date_added(config, record)?;
        self.set_tstamp(config, record)?;
        self.generate_alias(config, record)?;
        self.apply_sorting(config, record, position)?;
        Ok(())
    }

    /// 创建时间：仅在字段为空时写入，从不覆盖
    pub fn set_date_added(
        &self,
        config: &ImportConfig,
        record: &mut PersistedRecord,
    ) -> ImportResult<bool> {
        let field = match enabled_field(config.set_date_added, &config.date_added_field) {
            Some(field) => field,
            None => return Ok(false),
        };
        if !record.has_valid_id() {
            return Ok(false);
        }
        if record.get(field).map(|v| !v.is_empty()).unwrap_or(false) {
            return Ok(false);
        }

        let now = self.clock.now_timestamp();
        self.write_field(record, field, FieldValue::Integer(now))?;
        Ok(true)
    }

    /// 更新时间：每次都写入当前时间
    pub fn set_tstamp(
        &self,
        config: &ImportConfig,
        record: &mut PersistedRecord,
    ) -> ImportResult<bool> {
        let field = match enabled_field(config.set_tstamp, &config.tstamp_field) {
            Some(field) => field,
            None => return Ok(false),
        };

        let now = self.clock.now_timestamp();
        self.write_field(record, field, FieldValue::Integer(now))?;
        Ok(true)
    }

    /// 生成唯一别名
    ///
    /// 模板中的 %field% 替换为记录值 → slug；
    /// 与其他行冲突时依次尝试 "{slug}-{id}"、"{slug}-{id}-2" …
    pub fn generate_alias(
        &self,
        config: &ImportConfig,
        record: &mut PersistedRecord,
    ) -> ImportResult<bool> {
        let field = match enabled_field(config.generate_alias, &config.alias_field) {
            Some(field) => field,
            None => return Ok(false),
        };
        let pattern = match config.alias_pattern.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(pattern) => pattern,
            None => return Ok(false),
        };
        if !record.has_valid_id() {
            return Ok(false);
        }

        let seed = alias_seed(pattern, record)?;
        let alias = self.unique_alias(field, &seed, record.id)?;
        self.write_field(record, field, FieldValue::Text(alias))?;
        Ok(true)
    }

    /// 排序值：SourceOrder 模式下 = 128 × 序号
    pub fn apply_sorting(
        &self,
        config: &ImportConfig,
        record: &mut PersistedRecord,
        position: usize,
    ) -> ImportResult<bool> {
        match config.sorting_mode {
            SortingMode::SourceOrder => {
                let value = SORTING_SPACING * position as i64;
                self.write_field(record, config.effective_sorting_field(), FieldValue::Integer(value))?;
                Ok(true)
            }
            SortingMode::None => Ok(false),
        }
    }

    fn unique_alias(&self, field: &str, seed: &str, id: i64) -> ImportResult<String> {
        let base = slug::slugify(seed);
        let base = if base.is_empty() { id.to_string() } else { base };

        if !self.alias_taken(field, &base, id)? {
            return Ok(base);
        }

        let with_id = format!("{}-{}", base, id);
        let mut candidate = with_id.clone();
        let mut suffix = 2;
        while self.alias_taken(field, &candidate, id)? {
            candidate = format!("{}-{}", with_id, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }

    /// 别名是否已被其他行占用
    fn alias_taken(&self, field: &str, alias: &str, own_id: i64) -> ImportResult<bool> {
        let rows = self
            .store
            .find_many(&self.table, &Predicate::eq(field, alias))?;
        Ok(rows.iter().any(|row| row.id != own_id))
    }

    fn write_field(
        &self,
        record: &mut PersistedRecord,
        field: &str,
        value: FieldValue,
    ) -> ImportResult<()> {
        let mut values = MappedRecord::new();
        values.insert(field.to_string(), value.clone());
        self.store
            .update(&self.table, &values, &Predicate::by_id(record.id))?;
        debug!(table = %self.table, id = record.id, field = %field, "派生字段写入");
        record.set(field, value);
        Ok(())
    }
}

/// 开关开启且字段名非空时返回字段名
fn enabled_field(enabled: bool, field: &Option<String>) -> Option<&str> {
    if !enabled {
        return None;
    }
    field.as_deref().map(str::trim).filter(|f| !f.is_empty())
}

/// 别名种子：%field% → 记录中该字段的值（缺失为空）
pub fn alias_seed(pattern: &str, record: &PersistedRecord) -> ImportResult<String> {
    let seed = alias_token_regex()?.replace_all(pattern, |caps: &Captures| {
        record
            .get(&caps[1])
            .map(|v| v.to_string())
            .unwrap_or_default()
    });
    Ok(seed.into_owned())
}
