use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    ILike,
    In,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Option<FilterOp> {
        Some(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub field: String,
    pub operator: FilterOp,
    pub data: Value,
}

/// Maps a filter field (the JSON name) to a SQL column, with an optional
/// cast applied to bound parameters (`$1::timestamptz`).
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub column: &'static str,
    pub cast: Option<&'static str>,
}

impl ColumnSpec {
    pub const fn text(field: &'static str, column: &'static str) -> Self {
        Self { field, column, cast: None }
    }

    pub const fn cast(field: &'static str, column: &'static str, cast: &'static str) -> Self {
        Self { field, column, cast: Some(cast) }
    }
}

/// Parses a where-object into flat conditions. Only implicit equality and
/// `$op` objects are accepted; every top-level key is ANDed.
pub fn parse_conditions(where_data: &Value) -> Result<Vec<FilterWhereInfo>, super::FilterError> {
    let obj = match where_data {
        Value::Null => return Ok(vec![]),
        Value::Object(obj) => obj,
        _ => {
            return Err(super::FilterError::InvalidWhereClause(
                "WHERE must be an object".to_string(),
            ))
        }
    };

    let mut conditions = Vec::new();
    for (field, value) in obj {
        if field.starts_with('$') {
            return Err(super::FilterError::UnsupportedOperator(field.clone()));
        }
        match value {
            Value::Object(ops) => {
                for (op_key, op_val) in ops {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| super::FilterError::UnsupportedOperator(op_key.clone()))?;
                    conditions.push(FilterWhereInfo { field: field.clone(), operator, data: op_val.clone() });
                }
            }
            // Implicit equality: { field: value }
            other => conditions.push(FilterWhereInfo { field: field.clone(), operator: FilterOp::Eq, data: other.clone() }),
        }
    }
    Ok(conditions)
}
