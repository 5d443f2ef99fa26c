//! Axum request handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::Local;
use serde::Deserialize;
use tracing::{info, warn};

use crate::analysis::PatientArtifacts;
use crate::error::Error;
use crate::patient::{Patient, PatientForm};

use super::error::WebResult;
use super::flash::Flash;
use super::render;
use super::state::AppState;

/// Form posted by the re-run page.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshForm {
    /// Selected patient; kept as text so a missing or bad value can be reported.
    #[serde(default)]
    pub patient_id: String,
}

/// `GET /`
pub async fn home(State(state): State<AppState>) -> Html<String> {
    Html(render::home(&state.take_flashes()))
}

/// `GET /patients`
pub async fn list_patients(State(state): State<AppState>) -> WebResult<Html<String>> {
    let patients = state.with_storage(|s| s.list())?;
    Ok(Html(render::patient_list(&patients, &state.take_flashes())))
}

/// `GET /patients/new`
pub async fn new_patient(State(state): State<AppState>) -> Html<String> {
    Html(render::patient_form(
        "New patient",
        "/patients/new",
        &PatientForm::default(),
        &[],
        &state.take_flashes(),
    ))
}

/// `POST /patients/new`
///
/// Stores the patient, runs the analysis and records its NAD result. A
/// failed analysis leaves the patient registered without a result.
#[tracing::instrument(skip_all)]
pub async fn create_patient(
    State(state): State<AppState>,
    Form(form): Form<PatientForm>,
) -> WebResult<Response> {
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => return rejected_form(&state, "New patient", "/patients/new", &form, e),
    };

    let patient = Patient::from_valid(&valid, Local::now().naive_local());
    let id = match state.with_storage(|s| s.insert(&patient)) {
        Ok(id) => id,
        Err(e) => return rejected_form(&state, "New patient", "/patients/new", &form, e),
    };

    match state.analyzer().analyze(id).await {
        Ok(nad_result) => {
            if !state.with_storage(|s| s.set_nad_result(id, &nad_result))? {
                warn!("Patient {} was deleted during its analysis", id);
                state.flash(Flash::danger(deleted_during_analysis(id)));
                return Ok(Redirect::to("/patients").into_response());
            }
            info!("Patient {} analysed, NAD result {}", id, nad_result);
            state.flash(Flash::success("The patient was added successfully."));
            Ok(Redirect::to("/report").into_response())
        }
        Err(e) => {
            warn!("Analysis of new patient {} failed: {}", id, e);
            state.flash(Flash::danger(format!(
                "The patient was saved, but the QRS analysis failed: {e}"
            )));
            Ok(Redirect::to("/patients").into_response())
        }
    }
}

/// `GET /patients/{id}/edit`
pub async fn edit_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> WebResult<Html<String>> {
    let patient = state.with_storage(|s| s.require(id))?;
    Ok(Html(render::patient_form(
        &format!("Edit {}", patient.full_name()),
        &edit_action(id),
        &PatientForm::from_patient(&patient),
        &[],
        &state.take_flashes(),
    )))
}

/// `POST /patients/{id}/edit`
#[tracing::instrument(skip(state, form))]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<PatientForm>,
) -> WebResult<Response> {
    let mut patient = state.with_storage(|s| s.require(id))?;
    let title = format!("Edit {}", patient.full_name());

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => return rejected_form(&state, &title, &edit_action(id), &form, e),
    };

    patient.apply(&valid);
    match state.with_storage(|s| s.update(&patient)) {
        Ok(true) => {
            state.flash(Flash::success("The patient's data was updated successfully."));
            Ok(Redirect::to("/patients").into_response())
        }
        Ok(false) => Err(Error::PatientNotFound { id }.into()),
        Err(e) => rejected_form(&state, &title, &edit_action(id), &form, e),
    }
}

/// `POST /patients/{id}/delete`
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> WebResult<Redirect> {
    if state.with_storage(|s| s.delete(id))? {
        state.flash(Flash::success("The patient was deleted successfully."));
    } else {
        state.flash(Flash::danger(format!("Patient {id} was not found.")));
    }
    Ok(Redirect::to("/patients"))
}

/// `GET /report`
pub async fn report(State(state): State<AppState>) -> WebResult<Html<String>> {
    let patients = state.with_storage(|s| s.list())?;
    let layout = state.analyzer().layout();

    let mut entries = Vec::with_capacity(patients.len());
    for patient in patients {
        let artifacts = PatientArtifacts::collect(layout, patient.id.unwrap_or_default()).await;
        entries.push((patient, artifacts));
    }

    Ok(Html(render::report(&entries, &state.take_flashes())))
}

/// `GET /reports/refresh`
pub async fn refresh_form(State(state): State<AppState>) -> WebResult<Html<String>> {
    let patients = state.with_storage(|s| s.list())?;
    Ok(Html(render::refresh_form(&patients, &state.take_flashes())))
}

/// `POST /reports/refresh`
///
/// Re-runs the analysis of one patient and refreshes its NAD result when
/// the result file can be read.
#[tracing::instrument(skip_all)]
pub async fn refresh_report(
    State(state): State<AppState>,
    Form(form): Form<RefreshForm>,
) -> WebResult<Redirect> {
    let back = Redirect::to("/reports/refresh");

    let Ok(id) = form.patient_id.trim().parse::<i64>() else {
        state.flash(Flash::danger("Select a patient to analyse."));
        return Ok(back);
    };

    if state.with_storage(|s| s.get(id))?.is_none() {
        state.flash(Flash::danger(format!("Patient {id} was not found.")));
        return Ok(back);
    }

    let analyzer = state.analyzer();
    if let Err(e) = analyzer.run(id).await {
        warn!("Re-analysis of patient {} failed: {}", id, e);
        state.flash(Flash::danger(format!("Error while updating the report: {e}")));
        return Ok(back);
    }

    match analyzer.nad_result(id).await {
        Ok(nad_result) => {
            if !state.with_storage(|s| s.set_nad_result(id, &nad_result))? {
                warn!("Patient {} was deleted during its analysis", id);
                state.flash(Flash::danger(deleted_during_analysis(id)));
                return Ok(back);
            }
        }
        Err(e) => {
            warn!("No NAD result for patient {}: {}", id, e);
            state.flash(Flash::info(format!("The NAD result was not refreshed: {e}")));
        }
    }

    state.flash(Flash::success("The report was updated successfully."));
    Ok(back)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> WebResult<Json<serde_json::Value>> {
    let patients = state.with_storage(|s| s.count())?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "patients": patients,
    })))
}

fn deleted_during_analysis(id: i64) -> String {
    format!("Patient {id} was deleted before its analysis finished; the result was discarded.")
}

fn edit_action(id: i64) -> String {
    format!("/patients/{id}/edit")
}

/// Re-render a form with the submitted values after a user error.
///
/// Validation failures answer 400 and duplicates 409; other errors are
/// propagated.
fn rejected_form(
    state: &AppState,
    title: &str,
    action: &str,
    form: &PatientForm,
    err: Error,
) -> WebResult<Response> {
    let (status, messages) = match &err {
        Error::Validation { errors } => (
            StatusCode::BAD_REQUEST,
            errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ),
        Error::DuplicatePatient { .. } => (
            StatusCode::CONFLICT,
            vec!["This patient already exists in the database.".to_string()],
        ),
        _ => return Err(err.into()),
    };

    let html = render::patient_form(title, action, form, &messages, &state.take_flashes());
    Ok((status, Html(html)).into_response())
}
