//! HTML pages.
//!
//! Pages are plain formatted strings. Every value that comes from a user,
//! the database or a result file goes through [`escape`].

use std::fmt::Write;

use axum::http::StatusCode;

use crate::analysis::PatientArtifacts;
use crate::patient::{Patient, PatientForm};

use super::flash::Flash;

const STYLE: &str = "\
body{font-family:sans-serif;margin:0;background:#f6f7f9;color:#222}\
nav{background:#8b1e2d;padding:.6em 1.2em}nav a{color:#fff;margin-right:1.2em;text-decoration:none}\
main{padding:1.2em;max-width:1100px}\
.flash{padding:.6em 1em;margin:.4em 0;border-radius:4px}\
.flash-success{background:#d9f2dd}.flash-danger{background:#f8d7da}.flash-info{background:#dbe9f7}\
table{border-collapse:collapse;width:100%;background:#fff}td,th{border:1px solid #ddd;padding:.4em;text-align:left}\
label{display:block;margin-top:.6em}input,select,textarea{width:100%;max-width:480px}\
.patient{background:#fff;margin:1em 0;padding:1em;border:1px solid #ddd}\
.plots{display:flex;gap:1em;flex-wrap:wrap}.plots figure{margin:0;max-width:340px}.plots img{max-width:100%}\
pre{background:#f0f0f0;padding:.6em;white-space:pre-wrap}\
form.inline{display:inline}";

/// Escape text for HTML element content and quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap a page body with navigation and queued messages.
#[must_use]
pub fn layout(title: &str, flashes: &[Flash], body: &str) -> String {
    let mut messages = String::new();
    for flash in flashes {
        let _ = write!(
            messages,
            r#"<div class="flash flash-{}">{}</div>"#,
            flash.level.as_str(),
            escape(&flash.message)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} · cardiodesk</title><style>{STYLE}</style></head>
<body>
<nav><a href="/">Home</a><a href="/patients/new">New patient</a><a href="/patients">Patients</a><a href="/report">Report</a><a href="/reports/refresh">Re-run analysis</a></nav>
<main>
<h1>{title}</h1>
{messages}
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    )
}

/// Landing page.
#[must_use]
pub fn home(flashes: &[Flash]) -> String {
    let body = r#"<p>Register patients, run the QRS/RR/QT analysis and review the results.</p>
<ul>
<li><a href="/patients/new">Register a new patient</a></li>
<li><a href="/patients">Manage patients</a></li>
<li><a href="/report">View the analysis report</a></li>
<li><a href="/reports/refresh">Re-run an analysis</a></li>
</ul>"#;
    layout("Cardiac analysis", flashes, body)
}

/// Intake or edit form.
///
/// `errors` are shown above the form; values are pre-filled from `form`.
#[must_use]
pub fn patient_form(
    title: &str,
    action: &str,
    form: &PatientForm,
    errors: &[String],
    flashes: &[Flash],
) -> String {
    let mut body = String::new();

    if !errors.is_empty() {
        body.push_str(r#"<div class="flash flash-danger"><ul>"#);
        for error in errors {
            let _ = write!(body, "<li>{}</li>", escape(error));
        }
        body.push_str("</ul></div>");
    }

    let _ = write!(body, r#"<form method="post" action="{}">"#, escape(action));
    text_input(&mut body, "last_name", "Last name", &form.last_name, "text", true);
    text_input(&mut body, "first_name", "First name", &form.first_name, "text", true);

    body.push_str(r#"<label for="sex">Sex</label><select id="sex" name="sex" required>"#);
    for (value, label) in [("", "-"), ("F", "Female"), ("M", "Male")] {
        let selected = if form.sex == value { " selected" } else { "" };
        let _ = write!(body, r#"<option value="{value}"{selected}>{label}</option>"#);
    }
    if !form.sex.is_empty() && form.sex != "F" && form.sex != "M" {
        let v = escape(&form.sex);
        let _ = write!(body, r#"<option value="{v}" selected>{v}</option>"#);
    }
    body.push_str("</select>");

    text_input(&mut body, "birth_date", "Birth date", &form.birth_date, "date", true);
    text_input(&mut body, "address", "Address", &form.address, "text", false);
    text_input(&mut body, "insurance", "Insurance", &form.insurance, "text", false);
    text_input(&mut body, "social_id", "Social security number", &form.social_id, "text", false);
    text_input(&mut body, "weight", "Weight (kg)", &form.weight, "text", false);
    text_input(&mut body, "height", "Height (cm)", &form.height, "text", false);
    text_input(&mut body, "bmi", "BMI (computed when empty)", &form.bmi, "text", false);
    text_area(&mut body, "medications", "Medications", &form.medications);
    text_area(&mut body, "medical_history", "Medical history", &form.medical_history);
    body.push_str(r#"<p><button type="submit">Save</button></p></form>"#);

    layout(title, flashes, &body)
}

fn text_input(out: &mut String, name: &str, label: &str, value: &str, kind: &str, required: bool) {
    let required = if required { " required" } else { "" };
    let _ = write!(
        out,
        r#"<label for="{name}">{label}</label><input id="{name}" name="{name}" type="{kind}" value="{}"{required}>"#,
        escape(value)
    );
}

fn text_area(out: &mut String, name: &str, label: &str, value: &str) {
    let _ = write!(
        out,
        r#"<label for="{name}">{label}</label><textarea id="{name}" name="{name}" rows="4">{}</textarea>"#,
        escape(value)
    );
}

/// Patient management table.
#[must_use]
pub fn patient_list(patients: &[Patient], flashes: &[Flash]) -> String {
    if patients.is_empty() {
        return layout(
            "Patients",
            flashes,
            r#"<p>No patients registered yet. <a href="/patients/new">Register one</a>.</p>"#,
        );
    }

    let mut body = String::from(
        "<table><tr><th>#</th><th>Name</th><th>Sex</th><th>Birth date</th>\
         <th>Insurance</th><th>NAD result</th><th>Registered</th><th></th></tr>",
    );
    for patient in patients {
        let id = patient.id.unwrap_or_default();
        let _ = write!(
            body,
            r#"<tr><td>{id}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href="/patients/{id}/edit">Edit</a> <form class="inline" method="post" action="/patients/{id}/delete"><button type="submit">Delete</button></form></td></tr>"#,
            escape(&patient.full_name()),
            escape(&patient.sex),
            escape(&patient.birth_date),
            escape(&patient.insurance),
            escape(patient.nad_result.as_deref().unwrap_or("-")),
            patient.created_at_display(),
        );
    }
    body.push_str("</table>");

    layout("Patients", flashes, &body)
}

/// Full report: one section per patient with plots and summaries.
#[must_use]
pub fn report(entries: &[(Patient, PatientArtifacts)], flashes: &[Flash]) -> String {
    if entries.is_empty() {
        return layout("Report", flashes, "<p>No patients registered yet.</p>");
    }

    let mut body = String::new();
    for (patient, artifacts) in entries {
        let id = patient.id.unwrap_or_default();
        let _ = write!(
            body,
            r#"<section class="patient" id="patient-{id}"><h2>{}</h2><table>"#,
            escape(&patient.full_name())
        );
        for (label, value) in [
            ("Sex", patient.sex.as_str()),
            ("Birth date", patient.birth_date.as_str()),
            ("Address", patient.address.as_str()),
            ("Insurance", patient.insurance.as_str()),
            ("Social security number", patient.social_id.as_str()),
            ("Weight", patient.weight.as_str()),
            ("Height", patient.height.as_str()),
            ("BMI", patient.bmi.as_str()),
            ("Medications", patient.medications.as_str()),
            ("Medical history", patient.medical_history.as_str()),
            ("NAD result", patient.nad_result.as_deref().unwrap_or("-")),
        ] {
            let _ = write!(body, "<tr><th>{label}</th><td>{}</td></tr>", escape(value));
        }
        let _ = write!(
            body,
            "<tr><th>Registered</th><td>{}</td></tr></table>",
            patient.created_at_display()
        );

        body.push_str(r#"<div class="plots">"#);
        for plot in &artifacts.plots {
            let label = plot.kind.label();
            match &plot.url {
                Some(url) => {
                    let _ = write!(
                        body,
                        r#"<figure><img src="{}" alt="{label}"><figcaption>{label}</figcaption></figure>"#,
                        escape(url)
                    );
                }
                None => {
                    let _ = write!(
                        body,
                        "<figure><figcaption>{label}: {}</figcaption></figure>",
                        plot.kind.missing_message()
                    );
                }
            }
        }
        body.push_str("</div>");

        for summary in &artifacts.summaries {
            let _ = write!(
                body,
                "<h3>{}</h3><pre>{}</pre>",
                summary.kind.label(),
                escape(summary.text())
            );
        }
        body.push_str("</section>");
    }

    layout("Report", flashes, &body)
}

/// Patient picker for re-running an analysis.
#[must_use]
pub fn refresh_form(patients: &[Patient], flashes: &[Flash]) -> String {
    if patients.is_empty() {
        return layout(
            "Re-run analysis",
            flashes,
            "<p>No patients registered yet.</p>",
        );
    }

    let mut body = String::from(
        r#"<form method="post" action="/reports/refresh"><label for="patient_id">Patient</label><select id="patient_id" name="patient_id">"#,
    );
    for patient in patients {
        let id = patient.id.unwrap_or_default();
        let _ = write!(
            body,
            r#"<option value="{id}">#{id} {} ({})</option>"#,
            escape(&patient.full_name()),
            escape(&patient.birth_date)
        );
    }
    body.push_str(r#"</select><p><button type="submit">Run analysis</button></p></form>"#);

    layout("Re-run analysis", flashes, &body)
}

/// Error page.
#[must_use]
pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    layout(&title, &[], &format!("<p>{}</p>", escape(message)))
}
