// ==========================================
// 实体导入系统 - 字段映射器
// ==========================================
// 职责: 源记录 → 目标记录（列名 → 值）
// 规则: SourceValue 取源字段；StaticValue 经模板替换后原样写入
// 约束: 纯函数，无副作用；列合法性由调用方校验
// ==========================================

use crate::domain::{FieldMappingRule, FieldValue, MappedRecord, MappingValue, RawRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::template::{PlaceholderResolver, TemplateResolver};
use std::sync::Arc;

pub struct FieldMapper {
    resolver: Arc<dyn TemplateResolver>,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderResolver::new()))
    }
}

impl FieldMapper {
    pub fn new(resolver: Arc<dyn TemplateResolver>) -> Self {
        Self { resolver }
    }

    /// 按映射规则转换一条源记录
    ///
    /// # 参数
    /// - raw: 源记录
    /// - rules: 映射规则（目标列重复时后者覆盖前者）
    /// - row_number: 记录序号（1 起，用于错误信息）
    ///
    /// # 返回
    /// - Err(MissingSourceField): 源记录缺少规则引用的字段
    pub fn map(
        &self,
        raw: &RawRecord,
        rules: &[FieldMappingRule],
        row_number: usize,
    ) -> ImportResult<MappedRecord> {
        let mut mapped = MappedRecord::new();

        for rule in rules {
            let value = match &rule.value {
                MappingValue::SourceValue { source_field } => raw
                    .get(source_field)
                    .cloned()
                    .ok_or_else(|| ImportError::MissingSourceField {
                        row: row_number,
                        field: source_field.clone(),
                    })?,
                MappingValue::StaticValue { static_value } => {
                    FieldValue::Text(self.resolver.resolve(static_value, raw))
                }
            };

            mapped.insert(rule.column_name.clone(), value);
        }

        Ok(mapped)
    }
}
