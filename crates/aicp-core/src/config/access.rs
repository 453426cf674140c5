//! Access-scope configuration.
//!
//! Describes where patient rows live and which columns carry the doctor and
//! pharmacy scope. This is database structure, separate from role semantics,
//! which stay fixed in the policy builder.

use serde::{Deserialize, Serialize};

use crate::SENSITIVE_PATIENT_COLUMNS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Schema holding the portal tables.
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Table whose rows are scoped per doctor/pharmacy.
    #[serde(default = "default_patient_table")]
    pub patient_table: String,

    /// Table the credential resolver reads users from.
    #[serde(default = "default_users_table")]
    pub users_table: String,

    /// Column on the patient table holding the family doctor id.
    #[serde(default = "default_doctor_column")]
    pub doctor_filter_column: String,

    /// Column on the patient table holding the pharmacy id.
    #[serde(default = "default_pharmacy_column")]
    pub pharmacy_filter_column: String,

    /// Columns hidden from the pharmacy role.
    #[serde(default = "default_pii_columns")]
    pub pii_columns: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            patient_table: default_patient_table(),
            users_table: default_users_table(),
            doctor_filter_column: default_doctor_column(),
            pharmacy_filter_column: default_pharmacy_column(),
            pii_columns: default_pii_columns(),
        }
    }
}

impl AccessConfig {
    /// Schema-qualified patient table, e.g. `dbo.patients`.
    pub fn qualified_patient_table(&self) -> String {
        format!("{}.{}", self.schema, self.patient_table)
    }
}

fn default_schema() -> String {
    "dbo".to_string()
}

fn default_patient_table() -> String {
    "patients".to_string()
}

fn default_users_table() -> String {
    "portal_users".to_string()
}

fn default_doctor_column() -> String {
    "family_dr_id".to_string()
}

fn default_pharmacy_column() -> String {
    "pharmacy_id".to_string()
}

fn default_pii_columns() -> Vec<String> {
    SENSITIVE_PATIENT_COLUMNS.iter().map(|c| c.to_string()).collect()
}
