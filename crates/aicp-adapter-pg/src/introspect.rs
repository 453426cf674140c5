//! Schema summary for the SQL generator.

use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

const TRUNCATION_MARKER: &str = "\n... (schema truncated)";

/// Describe every base table in `schema` as
/// `Table <schema>.<table>(col type, ...)`, one per line, sorted by table
/// name and cut at `max_chars`.
pub async fn describe_schema(pool: &PgPool, schema: &str, max_chars: usize) -> anyhow::Result<String> {
    let rows = sqlx::query(
        r#"
        select c.table_name, c.column_name, c.data_type
        from information_schema.columns c
        join information_schema.tables t
          on t.table_schema = c.table_schema
         and t.table_name = c.table_name
        where c.table_schema = $1
          and t.table_type = 'BASE TABLE'
        order by c.table_name, c.ordinal_position
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let mut tables: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for row in rows {
        let table: String = row.try_get("table_name")?;
        let column: String = row.try_get("column_name")?;
        let data_type: String = row.try_get("data_type")?;
        tables.entry(table).or_default().push((column, data_type));
    }

    tracing::info!(schema, tables = tables.len(), "schema described");
    Ok(render_schema(schema, &tables, max_chars))
}

pub fn render_schema(
    schema: &str,
    tables: &BTreeMap<String, Vec<(String, String)>>,
    max_chars: usize,
) -> String {
    let text = tables
        .iter()
        .map(|(table, columns)| {
            let cols = columns
                .iter()
                .map(|(name, ty)| format!("{name} {ty}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Table {schema}.{table}({cols})")
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.chars().count() <= max_chars {
        return text;
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}
