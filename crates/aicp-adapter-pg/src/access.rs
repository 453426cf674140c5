use aicp_core::{AccessConfig, AccessContext, Role};
use aicp_runtime::{AccessResolver, AuthError};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::quote_ident;

/// Resolves API keys against the portal users table.
pub struct PgAccessResolver {
    pool: PgPool,
    lookup_sql: String,
}

impl PgAccessResolver {
    pub fn new(pool: PgPool, access: &AccessConfig) -> anyhow::Result<Self> {
        let table = format!(
            "{}.{}",
            quote_ident(&access.schema)?,
            quote_ident(&access.users_table)?
        );
        let lookup_sql = format!(
            "SELECT id, display_name, role, doctor_id, pharmacy_id FROM {table} \
             WHERE api_key = $1 AND is_active LIMIT 1"
        );
        Ok(Self { pool, lookup_sql })
    }
}

/// Integer ids may be stored as int4 or int8.
fn id_column(row: &PgRow, name: &str) -> Result<Option<i64>, sqlx::Error> {
    match row.try_get::<Option<i64>, _>(name) {
        Ok(v) => Ok(v),
        Err(_) => Ok(row.try_get::<Option<i32>, _>(name)?.map(i64::from)),
    }
}

#[async_trait]
impl AccessResolver for PgAccessResolver {
    async fn resolve(&self, credential: &str) -> Result<AccessContext, AuthError> {
        let row = sqlx::query(&self.lookup_sql)
            .bind(credential.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(anyhow::Error::from)?
            .ok_or(AuthError::InvalidCredential)?;

        let stored_role: String = row.try_get("role").map_err(anyhow::Error::from)?;
        let role: Role = stored_role
            .parse()
            .map_err(|_| AuthError::UnsupportedRole(stored_role.clone()))?;

        let user_id = id_column(&row, "id")
            .map_err(anyhow::Error::from)?
            .ok_or_else(|| AuthError::Backend(anyhow::anyhow!("user row has no id")))?;

        let ctx = AccessContext {
            user_id,
            display_name: row.try_get("display_name").map_err(anyhow::Error::from)?,
            role,
            doctor_id: id_column(&row, "doctor_id").map_err(anyhow::Error::from)?,
            pharmacy_id: id_column(&row, "pharmacy_id").map_err(anyhow::Error::from)?,
        };
        tracing::debug!(user_id = ctx.user_id, role = %ctx.role, "credential resolved");
        Ok(ctx)
    }
}
