//! Patient records and form validation.
//!
//! A [`PatientForm`] is what the intake and edit pages submit. It is turned
//! into a [`ValidPatient`] by [`PatientForm::validate`], which is the only way
//! to build or modify a [`Patient`].

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, FieldError, Result};

/// Format used to store and display creation timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of birth dates.
pub const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Maximum field lengths, in characters.
mod limits {
    pub const NAME: usize = 100;
    pub const SEX: usize = 10;
    pub const BIRTH_DATE: usize = 20;
    pub const ADDRESS: usize = 200;
    pub const INSURANCE: usize = 100;
    pub const SOCIAL_ID: usize = 100;
    pub const MEASURE: usize = 20;
    pub const MEDICATIONS: usize = 500;
    pub const HISTORY: usize = 1000;
}

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Row id (assigned by the storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Family name.
    pub last_name: String,
    /// Given name.
    pub first_name: String,
    /// Sex as entered on the form.
    pub sex: String,
    /// Birth date, `YYYY-MM-DD`.
    pub birth_date: String,
    /// Postal address.
    pub address: String,
    /// Insurance provider.
    pub insurance: String,
    /// Social security number.
    pub social_id: String,
    /// Weight in kilograms.
    pub weight: String,
    /// Height in centimetres or metres.
    pub height: String,
    /// Body-mass index.
    pub bmi: String,
    /// Current medications.
    pub medications: String,
    /// Free-text medical history.
    pub medical_history: String,
    /// Metric read back from the last successful analysis.
    pub nad_result: Option<String>,
    /// When the record was created (local time).
    pub created_at: NaiveDateTime,
}

/// Name and birth date, the key under which duplicates are detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatientIdentity {
    /// Family name.
    pub last_name: String,
    /// Given name.
    pub first_name: String,
    /// Birth date, `YYYY-MM-DD`.
    pub birth_date: String,
}

impl From<PatientIdentity> for Error {
    fn from(identity: PatientIdentity) -> Self {
        Error::DuplicatePatient {
            last_name: identity.last_name,
            first_name: identity.first_name,
            birth_date: identity.birth_date,
        }
    }
}

/// Raw form submission. Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientForm {
    /// Family name (required).
    pub last_name: String,
    /// Given name (required).
    pub first_name: String,
    /// Sex (required).
    pub sex: String,
    /// Birth date as `YYYY-MM-DD` (required).
    pub birth_date: String,
    /// Postal address.
    pub address: String,
    /// Insurance provider.
    pub insurance: String,
    /// Social security number.
    pub social_id: String,
    /// Weight in kilograms.
    pub weight: String,
    /// Height in centimetres, or metres when below 3.
    pub height: String,
    /// Body mass index; computed from weight and height when left empty.
    pub bmi: String,
    /// Current medications.
    pub medications: String,
    /// Free-text medical history.
    pub medical_history: String,
}

/// Form data that passed validation: trimmed, bounded, BMI filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPatient(PatientForm);

impl ValidPatient {
    /// The normalized field values.
    #[must_use]
    pub fn fields(&self) -> &PatientForm {
        &self.0
    }

    /// The duplicate-detection key.
    #[must_use]
    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            last_name: self.0.last_name.clone(),
            first_name: self.0.first_name.clone(),
            birth_date: self.0.birth_date.clone(),
        }
    }
}

impl PatientForm {
    /// Pre-fill a form from an existing record.
    #[must_use]
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            last_name: patient.last_name.clone(),
            first_name: patient.first_name.clone(),
            sex: patient.sex.clone(),
            birth_date: patient.birth_date.clone(),
            address: patient.address.clone(),
            insurance: patient.insurance.clone(),
            social_id: patient.social_id.clone(),
            weight: patient.weight.clone(),
            height: patient.height.clone(),
            bmi: patient.bmi.clone(),
            medications: patient.medications.clone(),
            medical_history: patient.medical_history.clone(),
        }
    }

    /// Validate against today's date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every offending field.
    pub fn validate(&self) -> Result<ValidPatient> {
        self.validate_at(Local::now().date_naive())
    }

    /// Validate, treating `today` as the latest acceptable birth date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every offending field.
    pub fn validate_at(&self, today: NaiveDate) -> Result<ValidPatient> {
        let mut form = self.trimmed();
        let mut errors = Vec::new();

        for (field, value) in [
            ("last_name", &form.last_name),
            ("first_name", &form.first_name),
            ("sex", &form.sex),
            ("birth_date", &form.birth_date),
        ] {
            if value.is_empty() {
                errors.push(FieldError::new(field, "is required"));
            }
        }

        for (field, value, max) in [
            ("last_name", &form.last_name, limits::NAME),
            ("first_name", &form.first_name, limits::NAME),
            ("sex", &form.sex, limits::SEX),
            ("birth_date", &form.birth_date, limits::BIRTH_DATE),
            ("address", &form.address, limits::ADDRESS),
            ("insurance", &form.insurance, limits::INSURANCE),
            ("social_id", &form.social_id, limits::SOCIAL_ID),
            ("weight", &form.weight, limits::MEASURE),
            ("height", &form.height, limits::MEASURE),
            ("bmi", &form.bmi, limits::MEASURE),
            ("medications", &form.medications, limits::MEDICATIONS),
            ("medical_history", &form.medical_history, limits::HISTORY),
        ] {
            if value.chars().count() > max {
                errors.push(FieldError::new(
                    field,
                    format!("must be at most {max} characters"),
                ));
            }
        }

        if !form.birth_date.is_empty() {
            match NaiveDate::parse_from_str(&form.birth_date, BIRTH_DATE_FORMAT) {
                Ok(date) if date > today => {
                    errors.push(FieldError::new("birth_date", "must not be in the future"));
                }
                // Zero-padded so the identity key compares equal.
                Ok(date) => form.birth_date = date.format(BIRTH_DATE_FORMAT).to_string(),
                Err(_) => errors.push(FieldError::new("birth_date", "must be a date (YYYY-MM-DD)")),
            }
        }

        let weight = parse_measure("weight", &form.weight, &mut errors);
        let height = parse_measure("height", &form.height, &mut errors);
        let bmi = parse_measure("bmi", &form.bmi, &mut errors);

        if bmi.is_none() && form.bmi.is_empty() {
            if let (Some(w), Some(h)) = (weight, height) {
                form.bmi = format!("{:.1}", body_mass_index(w, h));
            }
        }

        if errors.is_empty() {
            Ok(ValidPatient(form))
        } else {
            Err(Error::Validation { errors })
        }
    }

    fn trimmed(&self) -> Self {
        Self {
            last_name: self.last_name.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            sex: self.sex.trim().to_string(),
            birth_date: self.birth_date.trim().to_string(),
            address: self.address.trim().to_string(),
            insurance: self.insurance.trim().to_string(),
            social_id: self.social_id.trim().to_string(),
            weight: self.weight.trim().to_string(),
            height: self.height.trim().to_string(),
            bmi: self.bmi.trim().to_string(),
            medications: self.medications.trim().to_string(),
            medical_history: self.medical_history.trim().to_string(),
        }
    }
}

/// Parse an optional positive decimal; a comma is accepted as separator.
fn parse_measure(field: &'static str, raw: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    match raw.replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => {
            errors.push(FieldError::new(field, "must be a positive number"));
            None
        }
    }
}

/// BMI from kilograms and a height in metres, or in centimetres above 3.
fn body_mass_index(weight_kg: f64, height: f64) -> f64 {
    let metres = if height > 3.0 { height / 100.0 } else { height };
    weight_kg / (metres * metres)
}

impl Patient {
    /// Build a new, unsaved record.
    #[must_use]
    pub fn from_valid(valid: &ValidPatient, created_at: NaiveDateTime) -> Self {
        let f = valid.fields();
        Self {
            id: None,
            last_name: f.last_name.clone(),
            first_name: f.first_name.clone(),
            sex: f.sex.clone(),
            birth_date: f.birth_date.clone(),
            address: f.address.clone(),
            insurance: f.insurance.clone(),
            social_id: f.social_id.clone(),
            weight: f.weight.clone(),
            height: f.height.clone(),
            bmi: f.bmi.clone(),
            medications: f.medications.clone(),
            medical_history: f.medical_history.clone(),
            nad_result: None,
            created_at,
        }
    }

    /// Overwrite the editable fields, keeping id, timestamp and NAD result.
    pub fn apply(&mut self, valid: &ValidPatient) {
        let f = valid.fields();
        self.last_name.clone_from(&f.last_name);
        self.first_name.clone_from(&f.first_name);
        self.sex.clone_from(&f.sex);
        self.birth_date.clone_from(&f.birth_date);
        self.address.clone_from(&f.address);
        self.insurance.clone_from(&f.insurance);
        self.social_id.clone_from(&f.social_id);
        self.weight.clone_from(&f.weight);
        self.height.clone_from(&f.height);
        self.bmi.clone_from(&f.bmi);
        self.medications.clone_from(&f.medications);
        self.medical_history.clone_from(&f.medical_history);
    }

    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The duplicate-detection key.
    #[must_use]
    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            last_name: self.last_name.clone(),
            first_name: self.first_name.clone(),
            birth_date: self.birth_date.clone(),
        }
    }

    /// Creation time formatted for display and storage.
    #[must_use]
    pub fn created_at_display(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn valid_form() -> PatientForm {
        PatientForm {
            last_name: "Martin".to_string(),
            first_name: "Claire".to_string(),
            sex: "F".to_string(),
            birth_date: "1980-02-03".to_string(),
            address: "12 rue des Lilas".to_string(),
            weight: "64".to_string(),
            height: "170".to_string(),
            ..PatientForm::default()
        }
    }

    fn fields_of(err: &Error) -> Vec<&'static str> {
        err.field_errors().iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid_form_passes() {
        let valid = valid_form().validate_at(today()).unwrap();
        assert_eq!(valid.fields().last_name, "Martin");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let mut form = valid_form();
        form.last_name = "  Martin ".to_string();
        form.medications = "\taspirin\n".to_string();

        let valid = form.validate_at(today()).unwrap();
        assert_eq!(valid.fields().last_name, "Martin");
        assert_eq!(valid.fields().medications, "aspirin");
    }

    #[test]
    fn test_required_fields_collected() {
        let err = PatientForm::default().validate_at(today()).unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(
            fields_of(&err),
            vec!["last_name", "first_name", "sex", "birth_date"]
        );
    }

    #[test]
    fn test_whitespace_only_is_missing() {
        let mut form = valid_form();
        form.first_name = "   ".to_string();

        let err = form.validate_at(today()).unwrap_err();
        assert_eq!(fields_of(&err), vec!["first_name"]);
    }

    #[test]
    fn test_invalid_birth_date() {
        let mut form = valid_form();
        form.birth_date = "03/02/1980".to_string();

        let err = form.validate_at(today()).unwrap_err();
        assert_eq!(fields_of(&err), vec!["birth_date"]);
    }

    #[test]
    fn test_birth_date_is_zero_padded() {
        let mut form = valid_form();
        form.birth_date = "1980-2-3".to_string();

        let valid = form.validate_at(today()).unwrap();
        assert_eq!(valid.fields().birth_date, "1980-02-03");
        assert_eq!(valid.identity(), valid_form().validate_at(today()).unwrap().identity());
    }

    #[test]
    fn test_future_birth_date() {
        let mut form = valid_form();
        form.birth_date = "2024-06-02".to_string();

        let err = form.validate_at(today()).unwrap_err();
        assert!(err.to_string().contains("future"));
    }

    #[test]
    fn test_birth_date_today_is_allowed() {
        let mut form = valid_form();
        form.birth_date = "2024-06-01".to_string();
        assert!(form.validate_at(today()).is_ok());
    }

    #[test]
    fn test_too_long_field() {
        let mut form = valid_form();
        form.sex = "x".repeat(11);

        let err = form.validate_at(today()).unwrap_err();
        assert_eq!(fields_of(&err), vec!["sex"]);
        assert!(err.to_string().contains("at most 10"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut form = valid_form();
        form.last_name = "é".repeat(100);
        assert!(form.validate_at(today()).is_ok());
    }

    #[test]
    fn test_bmi_computed_from_centimetres() {
        let valid = valid_form().validate_at(today()).unwrap();
        // 64 / 1.70^2 = 22.145...
        assert_eq!(valid.fields().bmi, "22.1");
    }

    #[test]
    fn test_bmi_computed_from_metres_with_comma() {
        let mut form = valid_form();
        form.weight = "80,5".to_string();
        form.height = "1,80".to_string();

        let valid = form.validate_at(today()).unwrap();
        assert_eq!(valid.fields().bmi, "24.8");
    }

    #[test]
    fn test_explicit_bmi_kept() {
        let mut form = valid_form();
        form.bmi = "23".to_string();

        let valid = form.validate_at(today()).unwrap();
        assert_eq!(valid.fields().bmi, "23");
    }

    #[test]
    fn test_bmi_left_empty_without_height() {
        let mut form = valid_form();
        form.height = String::new();

        let valid = form.validate_at(today()).unwrap();
        assert!(valid.fields().bmi.is_empty());
    }

    #[test]
    fn test_non_numeric_measures_rejected() {
        let mut form = valid_form();
        form.weight = "heavy".to_string();
        form.height = "-170".to_string();

        let err = form.validate_at(today()).unwrap_err();
        assert_eq!(fields_of(&err), vec!["weight", "height"]);
    }

    #[test]
    fn test_from_valid_and_apply() {
        let created = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let valid = valid_form().validate_at(today()).unwrap();
        let mut patient = Patient::from_valid(&valid, created);
        patient.id = Some(4);
        patient.nad_result = Some("0.82".to_string());

        let mut form = valid_form();
        form.address = "1 place du Marché".to_string();
        patient.apply(&form.validate_at(today()).unwrap());

        assert_eq!(patient.id, Some(4));
        assert_eq!(patient.nad_result.as_deref(), Some("0.82"));
        assert_eq!(patient.address, "1 place du Marché");
        assert_eq!(patient.created_at_display(), "2024-05-01 09:30:00");
    }

    #[test]
    fn test_identity_and_full_name() {
        let valid = valid_form().validate_at(today()).unwrap();
        let patient = Patient::from_valid(&valid, Local::now().naive_local());

        assert_eq!(patient.full_name(), "Claire Martin");
        assert_eq!(patient.identity(), valid.identity());
    }

    #[test]
    fn test_form_round_trips_from_patient() {
        let valid = valid_form().validate_at(today()).unwrap();
        let patient = Patient::from_valid(&valid, Local::now().naive_local());

        assert_eq!(&PatientForm::from_patient(&patient), valid.fields());
    }

    #[test]
    fn test_identity_into_duplicate_error() {
        let err: Error = valid_form().validate_at(today()).unwrap().identity().into();
        assert!(err.is_duplicate());
    }
}
