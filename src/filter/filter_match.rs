use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

use super::error::FilterError;
use super::types::{parse_conditions, ColumnSpec, FilterOp, FilterWhereInfo};

/// A where-object checked against a column set and evaluated against
/// serialized records, with the same semantics the SQL compiler produces.
#[derive(Debug)]
pub struct FilterMatch {
    conditions: Vec<FilterWhereInfo>,
}

impl FilterMatch {
    /// Rejects what `FilterWhere::generate` rejects, whether or not any
    /// record is ever matched.
    pub fn compile(where_data: &Value, columns: &[ColumnSpec]) -> Result<Self, FilterError> {
        let conditions = parse_conditions(where_data)?;
        for condition in &conditions {
            if !columns.iter().any(|c| c.field == condition.field) {
                return Err(FilterError::InvalidColumn(condition.field.clone()));
            }
            match condition.operator {
                FilterOp::ILike if !condition.data.is_string() => {
                    return Err(FilterError::InvalidOperatorData("$ilike requires a string".to_string()));
                }
                FilterOp::In if !condition.data.is_array() => {
                    return Err(FilterError::InvalidOperatorData("$in requires an array".to_string()));
                }
                _ => {}
            }
        }
        Ok(Self { conditions })
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|condition| Self::matches_condition(condition, record))
    }

    fn matches_condition(condition: &FilterWhereInfo, record: &Value) -> bool {
        let field = record.get(&condition.field).unwrap_or(&Value::Null);
        let expected = &condition.data;

        match condition.operator {
            FilterOp::Eq => Self::equals(field, expected),
            FilterOp::Ne => !Self::equals(field, expected),
            FilterOp::Gt => Self::compare(field, expected) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(Self::compare(field, expected), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => Self::compare(field, expected) == Some(Ordering::Less),
            FilterOp::Lte => matches!(Self::compare(field, expected), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::ILike => match (field.as_str(), expected.as_str()) {
                (Some(value), Some(pattern)) => ilike(value, pattern),
                _ => false,
            },
            FilterOp::In => expected
                .as_array()
                .map(|values| values.iter().any(|v| Self::equals(field, v)))
                .unwrap_or(false),
        }
    }

    fn equals(field: &Value, expected: &Value) -> bool {
        if field.is_null() || expected.is_null() {
            return field.is_null() && expected.is_null();
        }
        field == expected || Self::compare(field, expected) == Some(Ordering::Equal)
    }

    // SQL comparisons against NULL are never true
    fn compare(field: &Value, expected: &Value) -> Option<Ordering> {
        match (field, expected) {
            (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            },
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Case-insensitive SQL LIKE: `%` matches any run, `_` matches one character.
fn ilike(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.to_lowercase().chars().collect();
    let pattern = like_tokens(&pattern.to_lowercase());

    // dp[j]: pattern[..i] matches value[..j]
    let mut dp = vec![false; value.len() + 1];
    dp[0] = true;
    for p in &pattern {
        let mut next = vec![false; value.len() + 1];
        match p {
            LikeToken::Any => {
                let mut seen = false;
                for j in 0..=value.len() {
                    seen |= dp[j];
                    next[j] = seen;
                }
            }
            LikeToken::One => {
                for j in 1..=value.len() {
                    next[j] = dp[j - 1];
                }
            }
            LikeToken::Char(c) => {
                for j in 1..=value.len() {
                    next[j] = dp[j - 1] && value[j - 1] == *c;
                }
            }
        }
        dp = next;
    }
    dp[value.len()]
}

enum LikeToken {
    Any,
    One,
    Char(char),
}

/// Backslash escapes the next character, as in Postgres.
fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Char(chars.next().unwrap_or('\\')),
            c => LikeToken::Char(c),
        });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[ColumnSpec] = &[
        ColumnSpec::text("id", "id"),
        ColumnSpec::text("tenantId", "tenant_id"),
        ColumnSpec::text("title", "title"),
        ColumnSpec::cast("status", "status", "task_status"),
        ColumnSpec::text("assigneeId", "assignee_id"),
        ColumnSpec::cast("dueAt", "due_at", "timestamptz"),
    ];

    fn task() -> Value {
        json!({
            "id": "a",
            "tenantId": "t1",
            "title": "Quarterly VAT return",
            "status": "OPEN",
            "assigneeId": null,
            "dueAt": "2025-03-31T12:00:00Z",
        })
    }

    fn check(where_data: Value) -> bool {
        FilterMatch::compile(&where_data, COLUMNS).unwrap().matches(&task())
    }

    #[test]
    fn empty_filter_matches() {
        assert!(check(json!({})));
    }

    #[test]
    fn tenant_mismatch_excludes() {
        assert!(check(json!({"tenantId": "t1"})));
        assert!(!check(json!({"tenantId": "t2"})));
    }

    #[test]
    fn compares_timestamps_chronologically() {
        assert!(check(json!({"dueAt": {"$lte": "2025-03-31T12:00:00.500Z"}})));
        assert!(!check(json!({"dueAt": {"$gte": "2025-04-01T00:00:00+02:00"}})));
    }

    #[test]
    fn null_semantics_follow_sql() {
        assert!(check(json!({"assigneeId": null})));
        assert!(!check(json!({"assigneeId": "u1"})));
        assert!(!check(json!({"assigneeId": {"$gt": "a"}})));
    }

    #[test]
    fn ilike_and_in() {
        assert!(check(json!({"title": {"$ilike": "%vat%"}})));
        assert!(!check(json!({"title": {"$ilike": "vat%"}})));
        assert!(check(json!({"status": {"$in": ["OPEN", "BLOCKED"]}})));
        assert!(!check(json!({"id": {"$in": []}})));
    }

    #[test]
    fn rejects_unknown_fields_like_the_sql_compiler() {
        let err = FilterMatch::compile(&json!({"tenantId": "t1", "owner": "u1"}), COLUMNS).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(ref field) if field == "owner"));

        // A field present on the record but not filterable is still rejected
        assert!(FilterMatch::compile(&json!({"description": "x"}), COLUMNS).is_err());
    }

    #[test]
    fn rejects_bad_operator_data_up_front() {
        assert!(matches!(
            FilterMatch::compile(&json!({"title": {"$ilike": 3}}), COLUMNS),
            Err(FilterError::InvalidOperatorData(_))
        ));
        assert!(matches!(
            FilterMatch::compile(&json!({"id": {"$in": "a"}}), COLUMNS),
            Err(FilterError::InvalidOperatorData(_))
        ));
    }

    #[test]
    fn like_wildcards() {
        assert!(ilike("abc", "a_c"));
        assert!(ilike("abc", "%"));
        assert!(!ilike("abc", "a_"));
        assert!(ilike("", "%"));
        assert!(ilike("50%_off", "50\\%\\_off"));
        assert!(!ilike("50xyoff", "50\\%\\_off"));
    }
}
