//! Storage layer for cardiodesk.
//!
//! This module provides `SQLite`-based persistent storage for patient
//! records, including duplicate detection on name and birth date.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::patient::{Patient, PatientIdentity, TIMESTAMP_FORMAT};

use schema::PATIENT_COLUMNS;

/// Storage engine for patient records.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Insertion with duplicate detection
/// - Listing, lookup, update and deletion
/// - Recording the NAD result of the latest analysis
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes or migrates the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // The analysis script may read the database while the server writes.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new patient and return the assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePatient`] if a patient with the same name and
    /// birth date exists, or an error if the database operation fails.
    pub fn insert(&self, patient: &Patient) -> Result<i64> {
        let identity = patient.identity();
        if self.find_by_identity(&identity)?.is_some() {
            debug!(
                "Rejecting duplicate patient {} {}",
                identity.first_name, identity.last_name
            );
            return Err(identity.into());
        }

        self.conn
            .execute(
                r"
                INSERT INTO patients (
                    last_name, first_name, sex, birth_date, address, insurance,
                    social_id, weight, height, bmi, medications, medical_history,
                    nad_result, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ",
                params![
                    patient.last_name,
                    patient.first_name,
                    patient.sex,
                    patient.birth_date,
                    patient.address,
                    patient.insurance,
                    patient.social_id,
                    patient.weight,
                    patient.height,
                    patient.bmi,
                    patient.medications,
                    patient.medical_history,
                    patient.nad_result,
                    patient.created_at_display(),
                ],
            )
            .map_err(|e| map_constraint(e, &identity))?;

        let id = self.conn.last_insert_rowid();
        info!("Registered patient {} with id {}", patient.full_name(), id);
        Ok(id)
    }

    /// Get a patient by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<Patient>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
                [id],
                Self::row_to_patient,
            )
            .optional()?;
        Ok(result)
    }

    /// Get a patient by id, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PatientNotFound`] or a database error.
    pub fn require(&self, id: i64) -> Result<Patient> {
        self.get(id)?.ok_or(Error::PatientNotFound { id })
    }

    /// Find a patient by name and birth date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_by_identity(&self, identity: &PatientIdentity) -> Result<Option<Patient>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients
                     WHERE last_name = ?1 AND first_name = ?2 AND birth_date = ?3"
                ),
                params![
                    identity.last_name,
                    identity.first_name,
                    identity.birth_date
                ],
                Self::row_to_patient,
            )
            .optional()?;
        Ok(result)
    }

    /// List all patients in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self) -> Result<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY id"))?;

        let patients = stmt
            .query_map([], Self::row_to_patient)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    /// Save the editable fields of an existing patient.
    ///
    /// Returns `false` if no patient has the record's id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePatient`] if the new name and birth date
    /// belong to another patient, or an error if the database operation fails.
    pub fn update(&self, patient: &Patient) -> Result<bool> {
        let Some(id) = patient.id else {
            return Err(Error::internal("cannot update a patient without id"));
        };

        let identity = patient.identity();
        if let Some(other) = self.find_by_identity(&identity)? {
            if other.id != Some(id) {
                return Err(identity.into());
            }
        }

        let affected = self
            .conn
            .execute(
                r"
                UPDATE patients SET
                    last_name = ?1, first_name = ?2, sex = ?3, birth_date = ?4,
                    address = ?5, insurance = ?6, social_id = ?7, weight = ?8,
                    height = ?9, bmi = ?10, medications = ?11, medical_history = ?12
                WHERE id = ?13
                ",
                params![
                    patient.last_name,
                    patient.first_name,
                    patient.sex,
                    patient.birth_date,
                    patient.address,
                    patient.insurance,
                    patient.social_id,
                    patient.weight,
                    patient.height,
                    patient.bmi,
                    patient.medications,
                    patient.medical_history,
                    id,
                ],
            )
            .map_err(|e| map_constraint(e, &identity))?;

        if affected > 0 {
            info!("Updated patient {}", id);
        }
        Ok(affected > 0)
    }

    /// Record the NAD result of an analysis.
    ///
    /// Returns `false` if the patient no longer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_nad_result(&self, id: i64, nad_result: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE patients SET nad_result = ?1 WHERE id = ?2",
            params![nad_result, id],
        )?;
        Ok(affected > 0)
    }

    /// Delete a patient by id.
    ///
    /// Returns `true` if a patient was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?1", [id])?;
        if affected > 0 {
            info!("Deleted patient {}", id);
        }
        Ok(affected > 0)
    }

    /// Count registered patients.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_patients = self.count()?;

        let analysed_patients: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE nad_result IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT created_at FROM patients ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest_registration =
            newest.and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok());

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_patients,
            analysed_patients,
            newest_registration,
            db_size_bytes,
        })
    }

    /// Convert a database row to a Patient struct.
    fn row_to_patient(row: &rusqlite::Row) -> rusqlite::Result<Patient> {
        let created_at_str: String = row.get(14)?;
        let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| {
                warn!("Unparseable created_at '{}', using now", created_at_str);
                Local::now().naive_local()
            });

        Ok(Patient {
            id: Some(row.get(0)?),
            last_name: row.get(1)?,
            first_name: row.get(2)?,
            sex: row.get(3)?,
            birth_date: row.get(4)?,
            address: row.get(5)?,
            insurance: row.get(6)?,
            social_id: row.get(7)?,
            weight: row.get(8)?,
            height: row.get(9)?,
            bmi: row.get(10)?,
            medications: row.get(11)?,
            medical_history: row.get(12)?,
            nad_result: row.get(13)?,
            created_at,
        })
    }
}

/// Turn a unique-index violation into a duplicate error.
fn map_constraint(err: rusqlite::Error, identity: &PatientIdentity) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            identity.clone().into()
        }
        other => other.into(),
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of registered patients.
    pub total_patients: i64,
    /// Patients with a recorded NAD result.
    pub analysed_patients: i64,
    /// Creation time of the most recent registration.
    pub newest_registration: Option<NaiveDateTime>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
