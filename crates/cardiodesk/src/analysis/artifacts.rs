//! Plots and summaries written by the analysis.
//!
//! Every patient has three plots and three text summaries at fixed,
//! id-derived file names inside the configured result directories.

use std::path::{Path, PathBuf};

use crate::config::Config;

use super::ResultFormat;

/// Resolved result directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLayout {
    /// QRS detector plots.
    pub plots_dir: PathBuf,
    /// RR interval plots and summaries.
    pub rr_dir: PathBuf,
    /// QT interval plots and summaries.
    pub qt_dir: PathBuf,
    /// QRS detector log summaries.
    pub logs_dir: PathBuf,
    /// NAD result files.
    pub result_dir: PathBuf,
    /// Layout of the NAD result file.
    pub result_format: ResultFormat,
}

impl ResultLayout {
    /// Resolve every directory of `config` against the analysis working directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let r = &config.results;
        Self {
            plots_dir: config.resolve(&r.plots_dir),
            rr_dir: config.resolve(&r.rr_dir),
            qt_dir: config.resolve(&r.qt_dir),
            logs_dir: config.resolve(&r.logs_dir),
            result_dir: config.resolve(&r.result_dir),
            result_format: config.analysis.result_format,
        }
    }

    /// Directory backing a public artifact mount.
    #[must_use]
    pub fn dir(&self, dir: ArtifactDir) -> &Path {
        match dir {
            ArtifactDir::Plots => &self.plots_dir,
            ArtifactDir::Rr => &self.rr_dir,
            ArtifactDir::Qt => &self.qt_dir,
            ArtifactDir::Logs => &self.logs_dir,
        }
    }

    /// Location of an artifact on disk.
    #[must_use]
    pub fn path(&self, kind: ArtifactKind, patient_id: i64) -> PathBuf {
        self.dir(kind.dir()).join(kind.file_name(patient_id))
    }
}

/// Directories exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactDir {
    /// QRS plots.
    Plots,
    /// RR plots and summaries.
    Rr,
    /// QT plots and summaries.
    Qt,
    /// QRS log summaries.
    Logs,
}

impl ArtifactDir {
    /// All mounts.
    pub const ALL: [Self; 4] = [Self::Plots, Self::Rr, Self::Qt, Self::Logs];

    /// URL segment under `/artifacts`.
    #[must_use]
    pub fn mount(self) -> &'static str {
        match self {
            Self::Plots => "plots",
            Self::Rr => "rr",
            Self::Qt => "qt",
            Self::Logs => "logs",
        }
    }
}

/// One of the six per-patient files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// QRS offline detector plot.
    QrsPlot,
    /// RR interval plot.
    RrPlot,
    /// QT interval plot.
    QtPlot,
    /// QRS offline detector log summary.
    QrsSummary,
    /// RR interval summary.
    RrSummary,
    /// QT interval summary.
    QtSummary,
}

impl ArtifactKind {
    /// Plots in display order.
    pub const PLOTS: [Self; 3] = [Self::QrsPlot, Self::RrPlot, Self::QtPlot];

    /// Summaries in display order.
    pub const SUMMARIES: [Self; 3] = [Self::QrsSummary, Self::RrSummary, Self::QtSummary];

    /// File name for a patient.
    #[must_use]
    pub fn file_name(self, patient_id: i64) -> String {
        match self {
            Self::QrsPlot => format!("QRS_offline_detector_plot_{patient_id}.png"),
            Self::RrPlot => format!("RR_intervals_{patient_id}.png"),
            Self::QtPlot => format!("QT_intervals_plot_{patient_id}.png"),
            Self::QrsSummary => format!("QRS_offline_detector_log_summary_{patient_id}.txt"),
            Self::RrSummary => format!("RR_intervals_summary_{patient_id}.txt"),
            Self::QtSummary => format!("QT_intervals_summary_{patient_id}.txt"),
        }
    }

    /// Directory holding this artifact.
    #[must_use]
    pub fn dir(self) -> ArtifactDir {
        match self {
            Self::QrsPlot => ArtifactDir::Plots,
            Self::RrPlot | Self::RrSummary => ArtifactDir::Rr,
            Self::QtPlot | Self::QtSummary => ArtifactDir::Qt,
            Self::QrsSummary => ArtifactDir::Logs,
        }
    }

    /// Caption used on the report.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::QrsPlot => "QRS detection",
            Self::RrPlot => "RR intervals",
            Self::QtPlot => "QT intervals",
            Self::QrsSummary => "QRS detector log",
            Self::RrSummary => "RR interval summary",
            Self::QtSummary => "QT interval summary",
        }
    }

    /// Text shown in place of a missing file.
    #[must_use]
    pub fn missing_message(self) -> &'static str {
        match self {
            Self::QrsPlot | Self::RrPlot | Self::QtPlot => "Plot not available.",
            Self::QrsSummary => "The QRS detector log file was not found.",
            Self::RrSummary => "The RR interval summary file was not found.",
            Self::QtSummary => "The QT interval summary file was not found.",
        }
    }

    /// Public URL of the artifact.
    #[must_use]
    pub fn url(self, patient_id: i64) -> String {
        format!(
            "/artifacts/{}/{}",
            self.dir().mount(),
            self.file_name(patient_id)
        )
    }
}

/// A plot reference for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plot {
    /// Which plot.
    pub kind: ArtifactKind,
    /// URL when the file exists.
    pub url: Option<String>,
}

/// A summary for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Which summary.
    pub kind: ArtifactKind,
    /// File content, or `None` when the file does not exist.
    pub content: Option<String>,
}

impl Summary {
    /// Content, or the per-kind fallback message.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content
            .as_deref()
            .unwrap_or_else(|| self.kind.missing_message())
    }
}

/// Everything the report shows for one patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientArtifacts {
    /// QRS, RR and QT plots.
    pub plots: Vec<Plot>,
    /// QRS, RR and QT summaries.
    pub summaries: Vec<Summary>,
}

impl PatientArtifacts {
    /// Look up the artifacts of a patient.
    ///
    /// Unreadable summaries are reported as missing and logged.
    pub async fn collect(layout: &ResultLayout, patient_id: i64) -> Self {
        let mut plots = Vec::with_capacity(ArtifactKind::PLOTS.len());
        for kind in ArtifactKind::PLOTS {
            let exists = tokio::fs::try_exists(layout.path(kind, patient_id))
                .await
                .unwrap_or(false);
            plots.push(Plot {
                kind,
                url: exists.then(|| kind.url(patient_id)),
            });
        }

        let mut summaries = Vec::with_capacity(ArtifactKind::SUMMARIES.len());
        for kind in ArtifactKind::SUMMARIES {
            let path = layout.path(kind, patient_id);
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(text) => Some(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => {
                    tracing::warn!("Cannot read {}: {}", path.display(), e);
                    None
                }
            };
            summaries.push(Summary { kind, content });
        }

        Self { plots, summaries }
    }
}
