//! Postgres row to JSON conversion.

use bigdecimal::{BigDecimal, ToPrimitive};
use serde_json::{Number, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

pub fn row_values(row: &PgRow) -> anyhow::Result<Vec<Value>> {
    (0..row.columns().len())
        .map(|index| cell(row, index))
        .collect()
}

fn cell(row: &PgRow, index: usize) -> anyhow::Result<Value> {
    let column = &row.columns()[index];
    let value = match column.type_info().name() {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(|v| float(v as f64)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(float),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)?
            .map(|v| decimal(&v)),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)?
            .map(|v| Value::String(v.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)?
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(|v| Value::String(v.to_rfc3339())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
        other => match row.try_get::<Option<String>, _>(index) {
            Ok(text) => text.map(Value::String),
            Err(_) => {
                tracing::debug!(column = column.name(), pg_type = other, "undecodable column");
                None
            }
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

fn float(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

/// Integral decimals stay integers; others become floats.
pub fn decimal(v: &BigDecimal) -> Value {
    if v.is_integer()
        && let Some(i) = v.to_i64()
    {
        return Value::from(i);
    }
    v.to_f64().map_or(Value::Null, float)
}
