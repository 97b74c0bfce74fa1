use serde_json::Value;

use super::error::FilterError;
use super::types::{parse_conditions, ColumnSpec, FilterOp, FilterWhereInfo};

pub struct FilterWhere<'a> {
    columns: &'a [ColumnSpec],
    param_values: Vec<Value>,
    param_index: usize,
}

impl<'a> FilterWhere<'a> {
    pub fn new(columns: &'a [ColumnSpec], starting_param_index: usize) -> Self {
        Self {
            columns,
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Compile `where_data` to a SQL predicate. Parameters are numbered from
    /// `starting_param_index + 1`. An empty object compiles to `1=1`.
    pub fn generate(
        where_data: &Value,
        columns: &'a [ColumnSpec],
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(columns, starting_param_index);
        filter_where.build(where_data)
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        let conditions = parse_conditions(where_data)?;

        let mut sql_conditions = Vec::with_capacity(conditions.len());
        for condition in &conditions {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }

        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn column(&self, field: &str) -> Result<ColumnSpec, FilterError> {
        self.columns
            .iter()
            .find(|c| c.field == field)
            .copied()
            .ok_or_else(|| FilterError::InvalidColumn(field.to_string()))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let spec = self.column(&condition.field)?;
        let quoted_column = format!("\"{}\"", spec.column);

        let sql = match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    format!("{} IS NULL", quoted_column)
                } else {
                    format!("{} = {}", quoted_column, self.param(&spec, condition.data.clone()))
                }
            }
            FilterOp::Ne => {
                if condition.data.is_null() {
                    format!("{} IS NOT NULL", quoted_column)
                } else {
                    format!("{} <> {}", quoted_column, self.param(&spec, condition.data.clone()))
                }
            }
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(&spec, condition.data.clone())),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(&spec, condition.data.clone())),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(&spec, condition.data.clone())),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(&spec, condition.data.clone())),
            FilterOp::ILike => {
                if !condition.data.is_string() {
                    return Err(FilterError::InvalidOperatorData("$ilike requires a string".to_string()));
                }
                // Pattern is always text even on cast columns
                let text_spec = ColumnSpec { cast: None, ..spec };
                format!("{} ILIKE {}", quoted_column, self.param(&text_spec, condition.data.clone()))
            }
            FilterOp::In => match &condition.data {
                Value::Array(values) if values.is_empty() => "1=0".to_string(),
                Value::Array(values) => {
                    let params: Vec<String> = values.iter().map(|v| self.param(&spec, v.clone())).collect();
                    format!("{} IN ({})", quoted_column, params.join(", "))
                }
                _ => return Err(FilterError::InvalidOperatorData("$in requires an array".to_string())),
            },
        };
        Ok(sql)
    }

    fn param(&mut self, spec: &ColumnSpec, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        match spec.cast {
            Some(cast) => format!("${}::{}", self.param_index, cast),
            None => format!("${}", self.param_index),
        }
    }
}
