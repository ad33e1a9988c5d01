//! Condition filtering
//!
//! Each non-reserved query parameter is a condition. The key is scanned for
//! an operator with a non-anchored pattern, so the operator may sit anywhere
//! in the key; the field name is whatever precedes its first occurrence.
//! Keys without an operator mean "field loosely equals value".
//!
//! A matched operator text outside the supported set (a lone `=` or `!`)
//! rejects every record.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde_json::Value;

use super::QueryParams;
use crate::value::{loose_cmp, loose_eq};

fn operator_regex() -> &'static Regex {
    static OPERATOR: OnceLock<Regex> = OnceLock::new();
    OPERATOR.get_or_init(|| Regex::new(r"([><=!]=?|==)").expect("operator pattern is valid"))
}

/// Comparison operator found in a query key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    /// Parse operator text; `None` for texts the pattern can match but that
    /// are not operators (`=`, `!`)
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    fn holds(&self, field: Option<&Value>, value: &str) -> bool {
        // Missing fields fail every ordering comparison
        let ordered = |accept: fn(Ordering) -> bool| {
            field.is_some_and(|field| accept(loose_cmp(field, value)))
        };

        match self {
            Operator::Eq => loose_eq(field, value),
            Operator::Ne => !loose_eq(field, value),
            Operator::Lt => ordered(Ordering::is_lt),
            Operator::Le => ordered(Ordering::is_le),
            Operator::Gt => ordered(Ordering::is_gt),
            Operator::Ge => ordered(Ordering::is_ge),
        }
    }
}

/// One parsed query condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition<'a> {
    /// Key without operator: `record[field]` loosely equals `value`
    Equals { field: &'a str, value: &'a str },
    /// `record[field] <op> value`
    Compare {
        field: &'a str,
        op: Operator,
        value: &'a str,
    },
    /// Operator-looking text that is not a supported operator
    Reject,
}

impl<'a> Condition<'a> {
    pub fn parse(key: &'a str, value: &'a str) -> Self {
        let Some(found) = operator_regex().find(key) else {
            return Condition::Equals { field: key, value };
        };

        match Operator::parse(found.as_str()) {
            Some(op) => Condition::Compare {
                field: &key[..found.start()],
                op,
                value,
            },
            None => Condition::Reject,
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Condition::Equals { field, value } => loose_eq(record.get(*field), value),
            Condition::Compare { field, op, value } => op.holds(record.get(*field), value),
            Condition::Reject => false,
        }
    }
}

/// Keep the records that satisfy every condition in `params`
pub fn apply(records: &[Value], params: &QueryParams) -> Vec<Value> {
    let conditions: Vec<Condition<'_>> = params
        .filters()
        .map(|(key, value)| Condition::parse(key, value))
        .collect();

    records
        .iter()
        .filter(|record| conditions.iter().all(|c| c.matches(record)))
        .cloned()
        .collect()
}
