//! External cardiac analysis.
//!
//! The QRS/RR/QT detection runs in a separate program. This module starts it
//! for one patient, waits for it with a timeout, and reads back what it wrote:
//! the NAD result (see [`result`]) and the plots and summaries shown on the
//! report (see [`artifacts`]).

pub mod artifacts;
pub mod result;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};

pub use artifacts::{ArtifactDir, ArtifactKind, PatientArtifacts, ResultLayout};
pub use result::{read_nad_result, ResultFormat};

/// Environment variable carrying the database path to the analysis program.
pub const DATABASE_ENV: &str = "CARDIODESK_DATABASE";

/// Output of a successful analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock run time.
    pub elapsed: Duration,
}

/// Something that can analyse a patient's recording.
#[async_trait]
pub trait AnalysisRunner: Send + Sync + std::fmt::Debug {
    /// Run the analysis for one patient.
    ///
    /// # Errors
    ///
    /// Returns an error if the analysis cannot be started, fails, or times out.
    async fn run(&self, patient_id: i64) -> Result<AnalysisOutput>;
}

/// Runs `<program> <script> <patient_id>` as a child process.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    program: String,
    script: String,
    working_dir: PathBuf,
    database_path: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    /// Build a runner from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            program: config.analysis.program.clone(),
            script: config.analysis.script.clone(),
            working_dir: config.analysis.working_dir.clone(),
            database_path: config.database_path(),
            timeout: config.analysis_timeout(),
        }
    }

    /// Human-readable command line, for logs.
    #[must_use]
    pub fn command_line(&self, patient_id: i64) -> String {
        format!("{} {} {}", self.program, self.script, patient_id)
    }
}

#[async_trait]
impl AnalysisRunner for ScriptRunner {
    async fn run(&self, patient_id: i64) -> Result<AnalysisOutput> {
        debug!(
            "Running command: {} (in {})",
            self.command_line(patient_id),
            self.working_dir.display()
        );

        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.script)
            .arg(patient_id.to_string())
            .current_dir(&self.working_dir)
            .env(DATABASE_ENV, &self.database_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| Error::AnalysisSpawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                error!(
                    "Analysis of patient {} exceeded {:?}",
                    patient_id, self.timeout
                );
                return Err(Error::Timeout {
                    operation: format!("analysis of patient {patient_id}"),
                });
            }
        };
        let elapsed = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            error!("Error running QRS detector: {}", stderr.trim());
            return Err(Error::AnalysisFailed {
                patient_id,
                status: output.status,
                stderr: stderr.trim().to_string(),
            });
        }

        info!("Analysis of patient {} finished in {:?}", patient_id, elapsed);
        Ok(AnalysisOutput {
            stdout,
            stderr,
            elapsed,
        })
    }
}

/// Runs the analysis and reads back its NAD result.
#[derive(Debug, Clone)]
pub struct Analyzer {
    runner: Arc<dyn AnalysisRunner>,
    layout: ResultLayout,
}

impl Analyzer {
    /// Combine a runner with the directories it writes into.
    #[must_use]
    pub fn new(runner: Arc<dyn AnalysisRunner>, layout: ResultLayout) -> Self {
        Self { runner, layout }
    }

    /// Build the production analyzer from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ScriptRunner::from_config(config)),
            ResultLayout::from_config(config),
        )
    }

    /// Where results and artifacts are read from.
    #[must_use]
    pub fn layout(&self) -> &ResultLayout {
        &self.layout
    }

    /// Run the analysis only.
    ///
    /// # Errors
    ///
    /// Propagates runner failures.
    pub async fn run(&self, patient_id: i64) -> Result<AnalysisOutput> {
        self.runner.run(patient_id).await
    }

    /// Read the NAD result of the last run.
    ///
    /// # Errors
    ///
    /// Returns an error if the result file is missing or malformed.
    pub async fn nad_result(&self, patient_id: i64) -> Result<String> {
        read_nad_result(
            &self.layout.result_dir,
            self.layout.result_format,
            patient_id,
        )
        .await
    }

    /// Run the analysis, then read its NAD result.
    ///
    /// # Errors
    ///
    /// Returns the first failure of either step.
    pub async fn analyze(&self, patient_id: i64) -> Result<String> {
        self.run(patient_id).await?;
        self.nad_result(patient_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    fn runner_in(dir: &Path, program: &str, script: &str, timeout: Duration) -> ScriptRunner {
        ScriptRunner {
            program: program.to_string(),
            script: script.to_string(),
            working_dir: dir.to_path_buf(),
            database_path: dir.join("patients.db"),
            timeout,
        }
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, body: &str) -> String {
        let path = dir.join("analyse.sh");
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_command_line() {
        let runner = runner_in(Path::new("."), "python", "analyse.py", Duration::from_secs(1));
        assert_eq!(runner.command_line(12), "python analyse.py 12");
    }

    #[test]
    fn test_from_config() {
        let config = Config::default();
        let runner = ScriptRunner::from_config(&config);
        assert_eq!(runner.command_line(1), "python analyse.py 1");
        assert_eq!(runner.timeout, Duration::from_secs(300));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_runner_success_writes_result() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("RESULT")).unwrap();
        let script = write_script(
            tmp.path(),
            "echo \"db=$CARDIODESK_DATABASE\"\nprintf 'Patient %s\\nNAD: 0.91\\n' \"$1\" > RESULT/result_$1.txt\n",
        );
        let runner = runner_in(tmp.path(), "sh", &script, Duration::from_secs(10));

        let output = runner.run(3).await.unwrap();
        assert!(output.stdout.contains("patients.db"));

        let mut config = Config::default();
        config.analysis.working_dir = tmp.path().to_path_buf();
        let analyzer = Analyzer::new(Arc::new(runner), ResultLayout::from_config(&config));
        assert_eq!(analyzer.nad_result(3).await.unwrap(), "0.91");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_runner_nonzero_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), "echo 'no signal file' >&2\nexit 3\n");
        let runner = runner_in(tmp.path(), "sh", &script, Duration::from_secs(10));

        let err = runner.run(5).await.unwrap_err();
        match err {
            Error::AnalysisFailed {
                patient_id, stderr, ..
            } => {
                assert_eq!(patient_id, 5);
                assert_eq!(stderr, "no signal file");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_runner_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), "sleep 5\n");
        let runner = runner_in(tmp.path(), "sh", &script, Duration::from_millis(100));

        let err = runner.run(1).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_script_runner_missing_program() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner_in(
            tmp.path(),
            "/nonexistent/bin/analyse",
            "analyse.py",
            Duration::from_secs(1),
        );

        let err = runner.run(1).await.unwrap_err();
        assert!(matches!(err, Error::AnalysisSpawn { .. }));
    }

    #[derive(Debug)]
    struct FailingRunner;

    #[async_trait]
    impl AnalysisRunner for FailingRunner {
        async fn run(&self, _patient_id: i64) -> Result<AnalysisOutput> {
            Err(Error::internal("runner down"))
        }
    }

    #[tokio::test]
    async fn test_analyze_stops_on_runner_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.analysis.working_dir = tmp.path().to_path_buf();
        let analyzer = Analyzer::new(Arc::new(FailingRunner), ResultLayout::from_config(&config));

        let err = analyzer.analyze(1).await.unwrap_err();
        assert!(err.to_string().contains("runner down"));
    }
}
