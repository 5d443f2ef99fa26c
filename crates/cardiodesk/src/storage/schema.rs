//! `SQLite` schema definitions for cardiodesk.
//!
//! These statements create the base (version 1) schema. Later columns and
//! indexes are added by [`super::migrations`].

/// SQL statement to create the patients table.
pub const CREATE_PATIENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    last_name TEXT NOT NULL,
    first_name TEXT NOT NULL,
    sex TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    address TEXT NOT NULL DEFAULT '',
    weight TEXT NOT NULL DEFAULT '',
    height TEXT NOT NULL DEFAULT '',
    bmi TEXT NOT NULL DEFAULT '',
    medications TEXT NOT NULL DEFAULT '',
    medical_history TEXT NOT NULL DEFAULT '',
    nad_result TEXT,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Version 2: insurance and social security columns.
pub const ADD_INSURANCE_COLUMNS: &str = r"
ALTER TABLE patients ADD COLUMN insurance TEXT NOT NULL DEFAULT '';
ALTER TABLE patients ADD COLUMN social_id TEXT NOT NULL DEFAULT '';
";

/// Version 3: one record per name and birth date.
pub const CREATE_IDENTITY_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_patients_identity
    ON patients(last_name, first_name, birth_date)
";

/// All base schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_PATIENTS_TABLE, CREATE_METADATA_TABLE];

/// Column list shared by every patient query, in `row_to_patient` order.
pub const PATIENT_COLUMNS: &str = "id, last_name, first_name, sex, birth_date, address, \
     insurance, social_id, weight, height, bmi, medications, medical_history, \
     nad_result, created_at";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_patients_table_contains_identity_columns() {
        assert!(CREATE_PATIENTS_TABLE.contains("id INTEGER PRIMARY KEY"));
        assert!(CREATE_PATIENTS_TABLE.contains("last_name TEXT NOT NULL"));
        assert!(CREATE_PATIENTS_TABLE.contains("first_name TEXT NOT NULL"));
        assert!(CREATE_PATIENTS_TABLE.contains("birth_date TEXT NOT NULL"));
        assert!(CREATE_PATIENTS_TABLE.contains("nad_result TEXT,"));
    }

    #[test]
    fn test_identity_index_is_unique() {
        assert!(CREATE_IDENTITY_INDEX.contains("UNIQUE"));
        assert!(CREATE_IDENTITY_INDEX.contains("last_name, first_name, birth_date"));
    }

    #[test]
    fn test_patient_columns_count() {
        assert_eq!(PATIENT_COLUMNS.split(',').count(), 15);
    }
}
