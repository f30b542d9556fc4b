//! PulsAI: symptom-intake triage assistant.
//!
//! Command-line front-end over the triage core.

use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pulsai::adapters::model_store::ModelStore;
use pulsai::adapters::sanitize::SanitizingMakeWriter;
use pulsai::adapters::softmax::{SoftmaxClassifier, SoftmaxParams};
use pulsai::adapters::sqlite::SqliteVisitRecorder;
use pulsai::application::{
    render_report, train, EnsembleBuilder, ReportOptions, TrainingConfig, TrainingRecord,
    TriageRequest, TriageService,
};
use pulsai::config::{AppConfig, LogMode};
use pulsai::domain::{
    FusionEngine, Gender, GeneticRiskScorer, GuidanceRegistry, IntakeForm, Language, PatientRecord,
};
use pulsai::ports::VisitRecorder;

#[derive(Debug, Parser)]
#[command(
    name = "pulsai",
    version,
    about = "Symptom-intake triage assistant",
    long_about = "pulsai maps reported symptoms, demographics, chronic conditions and \
        family/lifestyle data to a probable diagnosis, a severity tier and a care \
        department.\n\nNot a medical device: results are for information only."
)]
struct Cli {
    /// SQLite database path (overrides PULSAI_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Model directory (overrides PULSAI_MODEL_PATH)
    #[arg(long, global = true)]
    models: Option<PathBuf>,

    /// Output language: tr or en (overrides PULSAI_LANGUAGE)
    #[arg(long, global = true)]
    lang: Option<Language>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train the three classifiers from a JSON dataset and save them
    Train(TrainArgs),
    /// Register (or update) a patient
    Register(RegisterArgs),
    /// Run triage for a registered patient and record the visit
    Triage(TriageArgs),
    /// Show a patient's visit history
    History(HistoryArgs),
    /// Delete a patient's visit history
    ClearHistory(PatientArgs),
    /// Check the model directory against its manifest
    VerifyModels,
}

#[derive(Debug, Args)]
struct TrainArgs {
    /// JSON array of training records
    #[arg(long)]
    dataset: PathBuf,

    /// Share of records held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    /// Seed of the train/test shuffle
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 300)]
    epochs: usize,

    #[arg(long, default_value_t = 0.5)]
    learning_rate: f64,
}

#[derive(Debug, Args)]
struct RegisterArgs {
    /// 11-digit national id number
    #[arg(long)]
    national_id: String,

    #[arg(long)]
    name: String,

    /// Birth date as YYYY-MM-DD
    #[arg(long)]
    birth_date: chrono::NaiveDate,

    /// male or female (erkek/kadın accepted)
    #[arg(long)]
    gender: Gender,

    /// Phone number or e-mail
    #[arg(long)]
    contact: String,
}

#[derive(Debug, Args)]
struct PatientArgs {
    #[arg(long)]
    patient_id: String,
}

#[derive(Debug, Args)]
struct TriageArgs {
    #[arg(long)]
    patient_id: String,

    /// Intake form as JSON; replaces the flags below
    #[arg(long, conflicts_with_all = ["symptoms", "age", "gender", "chronic"])]
    intake: Option<PathBuf>,

    /// Comma-separated symptoms
    #[arg(long, value_delimiter = ',')]
    symptoms: Vec<String>,

    #[arg(long)]
    age: Option<u32>,

    #[arg(long)]
    gender: Option<Gender>,

    /// Comma-separated chronic conditions
    #[arg(long, value_delimiter = ',')]
    chronic: Vec<String>,

    /// Write a plain-text report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Include the dynamic risk score in the report
    #[arg(long)]
    show_dynamic_risk: bool,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    #[arg(long)]
    patient_id: String,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    #[arg(long, default_value_t = 20)]
    limit: usize,
}

type Service = TriageService<SoftmaxClassifier, SqliteVisitRecorder>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }
    if let Some(models) = cli.models.clone() {
        config.model_path = models;
    }
    if let Some(lang) = cli.lang {
        config.language = lang;
    }

    let _guard = init_logging(&config)?;
    tracing::info!("Starting PulsAI...");
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Command::Train(args) => run_train(&config, &args),
        Command::Register(args) => run_register(&config, &args),
        Command::Triage(args) => run_triage(&config, &args),
        Command::History(args) => run_history(&config, &args),
        Command::ClearHistory(args) => run_clear_history(&config, &args),
        Command::VerifyModels => run_verify_models(&config),
    }
}

fn init_logging(config: &AppConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Results go to stdout; logs never do.
    let use_file = match config.log_mode {
        LogMode::File => true,
        LogMode::Stderr => false,
        LogMode::Auto => std::io::stdout().is_terminal(),
    };

    let (writer, guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            // Best-effort: the open below reports the real failure.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Cannot open log file {}", config.log_file.display()))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    Ok(guard)
}

fn model_store(config: &AppConfig) -> ModelStore {
    ModelStore::new(&config.model_path).require_manifest(config.require_model_manifest)
}

fn open_recorder(config: &AppConfig) -> Result<Arc<SqliteVisitRecorder>> {
    let recorder = SqliteVisitRecorder::new(&config.db_path)
        .with_context(|| format!("Cannot open database {}", config.db_path.display()))?;
    Ok(Arc::new(recorder))
}

fn open_service(config: &AppConfig) -> Result<Service> {
    let model_dir = &config.model_path;
    if !model_dir.exists() {
        bail!(
            "Model path not found at {}. Run `pulsai train` or set PULSAI_MODEL_PATH.",
            model_dir.display()
        );
    }

    let artifacts = model_store(config)
        .load()
        .with_context(|| format!("Failed to load models from {}", model_dir.display()))?;
    let ensemble = artifacts
        .bundles
        .into_iter()
        .fold(EnsembleBuilder::new(), EnsembleBuilder::with_bundle)
        .build()?;

    let service = TriageService::new(Arc::new(ensemble), artifacts.schema, open_recorder(config)?)?
        .with_fusion(FusionEngine::new(config.thresholds, GuidanceRegistry::default()))
        .with_genetic_scorer(GeneticRiskScorer::default().with_weights(config.degree_weights))
        .with_lifestyle_weights(config.lifestyle_weights);
    Ok(service)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        std::fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Cannot parse {}", path.display()))
}

fn run_train(config: &AppConfig, args: &TrainArgs) -> Result<()> {
    let records: Vec<TrainingRecord> = read_json(&args.dataset)?;
    let training = TrainingConfig {
        test_fraction: args.test_fraction,
        seed: args.seed,
        softmax: SoftmaxParams {
            learning_rate: args.learning_rate,
            epochs: args.epochs,
            ..SoftmaxParams::default()
        },
    };

    let trained = train(&records, &training)?;
    let manifest = model_store(config).save(&trained.schema, &trained.bundles)?;

    println!(
        "Trained on {} records ({} held out), feature width {}",
        trained.report.n_train, trained.report.n_test, trained.report.feature_width
    );
    for (target, accuracy) in &trained.report.accuracy {
        match accuracy {
            Some(a) => println!("  {:<10} accuracy {:.1}%", target.as_str(), a * 100.0),
            None => println!("  {:<10} accuracy n/a", target.as_str()),
        }
    }
    println!(
        "Saved {} artifacts to {}",
        manifest.files.len(),
        config.model_path.display()
    );
    Ok(())
}

fn run_register(config: &AppConfig, args: &RegisterArgs) -> Result<()> {
    let patient = PatientRecord::register(
        &args.national_id,
        args.name.clone(),
        args.birth_date,
        args.gender,
        args.contact.clone(),
    )
    .map_err(|errors| anyhow!(errors.join("; ")))?;

    let recorder = open_recorder(config)?;
    recorder.register_patient(&patient)?;

    println!("{}", patient.id);
    Ok(())
}

fn intake_from_args(args: &TriageArgs) -> Result<IntakeForm> {
    if let Some(path) = &args.intake {
        return read_json(path);
    }

    let (Some(age), Some(gender)) = (args.age, args.gender) else {
        bail!("Provide --intake, or --age and --gender with --symptoms");
    };
    let clean = |values: &[String]| -> BTreeSet<String> {
        values
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    };

    Ok(IntakeForm::new(age, gender)
        .with_symptoms(clean(&args.symptoms))
        .with_chronic_conditions(clean(&args.chronic)))
}

fn run_triage(config: &AppConfig, args: &TriageArgs) -> Result<()> {
    let service = open_service(config)?;
    let intake = intake_from_args(args)?;
    let patient = service
        .get_patient(&args.patient_id)?
        .ok_or_else(|| anyhow!("Unknown patient id; run `pulsai register` first"))?;

    let request = TriageRequest {
        patient_id: args.patient_id.clone(),
        language: config.language,
        intake,
    };
    let analysis = service.run_triage(&request)?;

    let report = render_report(
        &analysis,
        Some(&patient),
        Some(&request.intake),
        ReportOptions {
            show_dynamic_risk: args.show_dynamic_risk,
        },
    );
    match &args.report {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("Cannot write report to {}", path.display()))?;
            println!("{}", analysis.recommendation_text);
            println!("Report written to {}", path.display());
        }
        None => print!("{report}"),
    }
    Ok(())
}

fn run_history(config: &AppConfig, args: &HistoryArgs) -> Result<()> {
    let recorder = open_recorder(config)?;
    let page = recorder.load_visits(&args.patient_id, args.offset, args.limit)?;

    if page.items.is_empty() {
        println!("No visits recorded.");
        return Ok(());
    }
    for visit in &page.items {
        let a = &visit.analysis;
        println!(
            "{}  {:<6}  {} ({:.0}%)  -> {}",
            visit.recorded_at.format("%Y-%m-%d %H:%M"),
            a.tier.to_string(),
            a.diagnosis,
            a.diagnosis_confidence * 100.0,
            a.department
        );
    }
    println!(
        "Showing {}-{} of {}",
        page.offset + 1,
        page.offset + page.items.len(),
        page.total_count
    );
    if let Some(next) = page.next_offset() {
        println!("More: --offset {next}");
    }
    Ok(())
}

fn run_clear_history(config: &AppConfig, args: &PatientArgs) -> Result<()> {
    let recorder = open_recorder(config)?;
    let removed = recorder.clear_history(&args.patient_id)?;
    println!("Removed {removed} visit(s)");
    Ok(())
}

fn run_verify_models(config: &AppConfig) -> Result<()> {
    let store = model_store(config);
    match store.verify()? {
        Some(manifest) => println!(
            "OK: {} files match the manifest (created {})",
            manifest.files.len(),
            manifest.created_at.to_rfc3339()
        ),
        None if config.require_model_manifest => {
            bail!("No manifest in {}", config.model_path.display())
        }
        None => println!("No manifest in {}; files are unverified", config.model_path.display()),
    }
    store.load()?;
    println!("OK: models load with a consistent feature width");
    Ok(())
}
