// ==========================================
// 实体导入系统 - 查询条件
// ==========================================
// 用途: 合并查找 / 按 id 更新 / 导入前清空
// 约束: 值一律参数化绑定；Raw 子句来自配置，原样拼接
// ==========================================

use crate::domain::value::FieldValue;
use serde::{Deserialize, Serialize};

/// 单列等值条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub value: FieldValue,
}

impl Condition {
    pub fn new(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// 匹配全部行
    #[default]
    All,
    /// 所有条件 AND 连接
    Equals(Vec<Condition>),
    /// 配置给出的原始 WHERE 子句
    Raw(String),
}

impl Predicate {
    pub fn by_id(id: i64) -> Self {
        Predicate::Equals(vec![Condition::new("id", id)])
    }

    pub fn eq(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Equals(vec![Condition::new(column, value)])
    }

    /// 追加一个等值条件（All → Equals）
    pub fn and(self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        match self {
            Predicate::All => Predicate::eq(column, value),
            Predicate::Equals(mut conditions) => {
                conditions.push(Condition::new(column, value));
                Predicate::Equals(conditions)
            }
            raw @ Predicate::Raw(_) => raw,
        }
    }

    /// 生成 WHERE 子句及绑定参数
    ///
    /// 列名以 `"table"."column"` 形式限定；NULL 条件使用 IS NULL。
    pub fn to_sql(&self, table: &str) -> (String, Vec<FieldValue>) {
        match self {
            Predicate::All => ("1 = 1".to_string(), Vec::new()),
            Predicate::Raw(clause) if clause.trim().is_empty() => ("1 = 1".to_string(), Vec::new()),
            Predicate::Raw(clause) => (format!("({})", clause), Vec::new()),
            Predicate::Equals(conditions) if conditions.is_empty() => {
                ("1 = 1".to_string(), Vec::new())
            }
            Predicate::Equals(conditions) => {
                let mut params = Vec::new();
                let clauses: Vec<String> = conditions
                    .iter()
                    .map(|c| {
                        let column = format!("{}.{}", quote_ident(table), quote_ident(&c.column));
                        if c.value.is_null() {
                            format!("({} IS NULL)", column)
                        } else {
                            params.push(c.value.clone());
                            format!("({} = ?)", column)
                        }
                    })
                    .collect();
                (clauses.join(" AND "), params)
            }
        }
    }
}

/// 标识符加双引号（内部双引号转义）
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
