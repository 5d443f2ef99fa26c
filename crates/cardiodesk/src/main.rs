//! `cardiodesk` - CLI for the patient intake server
//!
//! This binary runs the web interface and offers a few maintenance commands
//! on the patient database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use tracing::info;

use cardiodesk::cli::{Cli, Command, ConfigCommand, OutputFormat, PatientsCommand, ServeCommand};
use cardiodesk::{init_logging, web, Analyzer, AppState, Config, Patient, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd).await,
        Command::InitDb => handle_init_db(&config),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Patients(PatientsCommand::List { format }) => handle_list(&config, format),
        Command::Analyze(analyze_cmd) => handle_analyze(&config, analyze_cmd.patient_id).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    if let Some(bind) = cmd.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    config
        .ensure_result_dirs()
        .context("creating result directories")?;
    let storage = open_storage(&config)?;
    let analyzer = Analyzer::from_config(&config);

    info!(
        "Analysis command: {} {} <patient id> in {}",
        config.analysis.program,
        config.analysis.script,
        config.analysis.working_dir.display()
    );

    web::serve(&config, AppState::new(storage, analyzer)).await?;
    Ok(())
}

fn handle_init_db(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    println!("Database ready: {}", storage.path().display());
    println!("Patients:       {}", storage.count()?);
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;
    let newest = stats
        .newest_registration
        .map(|t| t.format(cardiodesk::patient::TIMESTAMP_FORMAT).to_string());

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "total_patients": stats.total_patients,
            "analysed_patients": stats.analysed_patients,
            "newest_registration": newest,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("cardiodesk status");
        println!("-----------------");
        println!("Database:      {}", storage.path().display());
        println!("Patients:      {}", stats.total_patients);
        println!("Analysed:      {}", stats.analysed_patients);
        println!("Newest:        {}", newest.as_deref().unwrap_or("-"));
        println!("Size (bytes):  {}", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_list(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let patients = storage.list()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&patients)?);
        }
        OutputFormat::Plain => {
            for patient in &patients {
                println!("{}", summary_line(patient));
            }
        }
        OutputFormat::Table => {
            println!(
                "{:>5}  {:<30}  {:<3}  {:<10}  {:<12}  {}",
                "ID", "NAME", "SEX", "BORN", "NAD", "REGISTERED"
            );
            for patient in &patients {
                println!(
                    "{:>5}  {:<30}  {:<3}  {:<10}  {:<12}  {}",
                    patient.id.unwrap_or_default(),
                    patient.full_name(),
                    patient.sex,
                    patient.birth_date,
                    patient.nad_result.as_deref().unwrap_or("-"),
                    patient.created_at_display()
                );
            }
        }
    }
    Ok(())
}

fn summary_line(patient: &Patient) -> String {
    format!(
        "#{} {} ({}, born {}) NAD: {}",
        patient.id.unwrap_or_default(),
        patient.full_name(),
        patient.sex,
        patient.birth_date,
        patient.nad_result.as_deref().unwrap_or("-")
    )
}

async fn handle_analyze(config: &Config, patient_id: i64) -> anyhow::Result<()> {
    config
        .ensure_result_dirs()
        .context("creating result directories")?;
    let storage = open_storage(config)?;
    let patient = storage.require(patient_id)?;

    let analyzer = Analyzer::from_config(config);
    let nad_result = analyzer
        .analyze(patient_id)
        .await
        .with_context(|| format!("analysing patient {patient_id}"))?;
    storage.set_nad_result(patient_id, &nad_result)?;

    println!("{}: NAD result {}", patient.full_name(), nad_result);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Listen address:     {}", config.listen_addr());
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Analysis]");
                println!("  Program:            {}", config.analysis.program);
                println!("  Script:             {}", config.analysis.script);
                println!(
                    "  Working directory:  {}",
                    config.analysis.working_dir.display()
                );
                println!("  Timeout (secs):     {}", config.analysis.timeout_secs);
                println!("  Result format:      {}", config.analysis.result_format);
                println!();
                println!("[Results]");
                for (name, dir) in config.results.named_dirs() {
                    println!(
                        "  {:<19} {}",
                        format!("{name}:"),
                        config.resolve(dir).display()
                    );
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening database {}", path.display()))
}
