//! Command-line interface
//!
//! Subcommands cover the whole pipeline: prepare artifacts, fit the
//! baseline, serve predictions, send a batch request and report on it.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::artifacts::ArtifactStore;
use crate::client::{generate_records, send_batch, write_predictions, ClientConfig, PredictionSummary};
use crate::preprocessing::{PreprocessingConfig, ScalerType};
use crate::training::{
    class_counts, prepare_dataset, ClassificationMetrics, MajorityClassifier, ModelResult,
    ModelResults, PrepareConfig, Predictor, RESULTS_FILE,
};
use crate::utils::{split_target, DataLoader};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "mlops")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Loan approval pipeline: feature engineering, baseline, serving")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split, fit the transform on the train partition and save artifacts
    Prepare {
        /// Input table including the target column
        #[arg(short, long, requires = "target", conflicts_with_all = ["features", "labels"])]
        data: Option<PathBuf>,

        /// Target column name (with --data)
        #[arg(short, long)]
        target: Option<String>,

        /// Feature table (with --labels)
        #[arg(long, requires = "labels")]
        features: Option<PathBuf>,

        /// Label table with one row per feature row
        #[arg(long, requires = "features")]
        labels: Option<PathBuf>,

        /// Label column in the label table
        #[arg(long)]
        label_column: Option<String>,

        /// Artifact directory
        #[arg(short, long, default_value = "data")]
        output_dir: PathBuf,

        /// Fraction of rows held out for testing
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Split seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Scaler (standard, minmax, none)
        #[arg(long, default_value = "standard")]
        scaler: String,

        /// Columns to leave out of the transform
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Fit and evaluate the majority-class baseline on saved artifacts
    Baseline {
        /// Artifact directory
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Output model file (default: <data_dir>/model.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the inference server
    Serve {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Artifact directory
        #[arg(short, long)]
        data_dir: Option<String>,

        /// Model file
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Send synthetic records to a running server and save predictions
    Request {
        /// Prediction endpoint
        #[arg(short, long)]
        url: Option<String>,

        /// Number of records
        #[arg(short = 'n', long, default_value = "1000")]
        records: usize,

        /// Record generator seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output CSV
        #[arg(short, long, default_value = "data/predictions.csv")]
        output: PathBuf,
    },

    /// Summarize a predictions file
    Report {
        /// Predictions CSV
        #[arg(short, long, default_value = "data/predictions.csv")]
        file: PathBuf,

        /// Model results table (default: model_results.json next to the predictions)
        #[arg(short, long)]
        results: Option<PathBuf>,
    },

    /// Show the artifacts in a directory and the fitted transform
    Info {
        /// Artifact directory
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },
}

/// Where `prepare` reads its data from
pub enum DataSource<'a> {
    Table { path: &'a Path, target: &'a str },
    Split { features: &'a Path, labels: &'a Path, label_column: Option<&'a str> },
}

pub fn parse_scaler(name: &str) -> anyhow::Result<ScalerType> {
    match name.to_lowercase().as_str() {
        "standard" => Ok(ScalerType::Standard),
        "minmax" => Ok(ScalerType::MinMax),
        "none" => Ok(ScalerType::None),
        other => anyhow::bail!("Unknown scaler: {} (expected standard, minmax or none)", other),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_prepare(
    source: DataSource<'_>,
    output_dir: &Path,
    config: &PrepareConfig,
) -> anyhow::Result<()> {
    section("Prepare");

    step_run("Loading data");
    let start = Instant::now();
    let loader = DataLoader::new();
    let (df, labels) = match source {
        DataSource::Table { path, target } => split_target(&loader.load_auto(path)?, target)?,
        DataSource::Split { features, labels, label_column } => {
            loader.load_features_and_labels(features, labels, label_column)?
        }
    };
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let classes: Vec<String> = class_counts(&labels)
        .iter()
        .map(|(c, n)| format!("{}: {}", c, n))
        .collect();
    step_ok(&format!("Classes {}", classes.join(", ")));

    step_run("Splitting and fitting transform");
    let start = Instant::now();
    let prepared = prepare_dataset(&df, &labels, config)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output_dir.display()));
    ArtifactStore::new(output_dir).save_prepared(&prepared)?;
    step_done("5 files");

    let schema = prepared.transform.schema();
    println!();
    line_box_top();
    line_box(&format!("{}", "Feature engineering".white().bold()));
    line_box_sep();
    line_box(&kv("Numeric     ", &schema.numeric().len().to_string()));
    line_box(&kv("Categorical ", &schema.categorical().len().to_string()));
    line_box(&kv("Features out", &prepared.transform.n_features_out().to_string()));
    line_box(&kv("X_train     ", &format!("{} × {}", prepared.x_train.nrows(), prepared.x_train.ncols())));
    line_box(&kv("X_test      ", &format!("{} × {}", prepared.x_test.nrows(), prepared.x_test.ncols())));
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_baseline(data_dir: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Baseline");

    step_run("Loading artifacts");
    let dataset = ArtifactStore::new(data_dir).load_dataset()?;
    step_done(&format!("{} train / {} test rows", dataset.y_train.len(), dataset.y_test.len()));

    let mut model = MajorityClassifier::new();
    model.fit(&dataset.x_train, &dataset.y_train)?;
    let train_metrics =
        ClassificationMetrics::compute(&dataset.y_train, &model.predict(&dataset.x_train)?)?;
    let metrics = ClassificationMetrics::compute(&dataset.y_test, &model.predict(&dataset.x_test)?)?;

    let model_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join("model.json"));
    model.save(&model_path)?;

    let results_path = sibling_results(&model_path);
    let mut results = ModelResults::load_or_default(&results_path)?;
    results.record(ModelResult::new(model.name(), train_metrics, metrics.clone()));
    results.save(&results_path)?;

    let [[tn, fp], [fn_, tp]] = metrics.confusion_matrix;
    println!();
    println!("  {:<16} {}", muted("Majority class"), model.majority_class().unwrap_or_default().to_string().white().bold());
    println!("  {:<16} {}", muted("Accuracy"), format!("{:.3}", metrics.accuracy).white().bold());
    println!("  {:<16} {}", muted("F1 score"), format!("{:.3}", metrics.f1_score).white());
    println!("  {:<16} {}", muted("Confusion"), format!("[[{}, {}], [{}, {}]]", tn, fp, fn_, tp).white());
    println!();
    step_ok(&format!("Model saved to {}", model_path.display()));
    step_ok(&format!("Results saved to {}", results_path.display()));
    println!();

    Ok(())
}

/// `model_results.json` in the same directory as `path`
pub fn sibling_results(path: &Path) -> PathBuf {
    path.parent()
        .map(|p| p.join(RESULTS_FILE))
        .unwrap_or_else(|| PathBuf::from(RESULTS_FILE))
}

pub async fn cmd_serve(config: crate::server::ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    println!();
    line_box_top();
    line_box(&format!("{}", "Loan approval inference".white().bold()));
    line_box(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_sep();
    line_box(&kv("Predict", &format!("POST http://{}/predict", addr)));
    line_box(&kv("Health ", &format!("GET  http://{}/health", addr)));
    line_box(&kv("Data   ", &config.data_dir));
    line_box_bottom();
    println!();

    crate::server::run_server(config).await
}

pub async fn cmd_request(config: &ClientConfig) -> anyhow::Result<()> {
    section("Request");

    let records = generate_records(config.n_records, config.seed);
    step_ok(&format!("Generated {} records (seed {})", records.len(), config.seed));

    step_run(&format!("POST {}", config.url));
    let start = Instant::now();
    let response = send_batch(&config.url, &records, Duration::from_secs(config.timeout_secs)).await?;
    step_done(&format!("{} predictions in {:?}", response.total_records, start.elapsed()));

    write_predictions(&records, &response.predictions, &config.output)?;
    step_ok(&format!("Saved {}", config.output.display()));

    print_summary(&PredictionSummary::from_predictions(&response.predictions));
    Ok(())
}

pub fn cmd_report(file: &Path, results: Option<&Path>) -> anyhow::Result<()> {
    let results_path = results
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_results(file));
    let table = ModelResults::load_or_default(&results_path)?;

    section("Model comparison");
    if table.is_empty() {
        println!("  {}", dim(&format!("No results in {}", results_path.display())));
    } else {
        print_results(&table);
    }

    section("Prediction report");

    let df = DataLoader::new().load_auto(file)?;
    println!("  {:<12} {}", muted("File"), file.display());
    println!("  {:<12} {}", muted("Columns"), df.width());

    let summary = PredictionSummary::from_frame(&df)?;
    print_summary(&summary);
    Ok(())
}

fn print_results(table: &ModelResults) {
    println!(
        "  {:<20} {:>10} {:>10} {:>10} {:>10}",
        muted("Model"),
        muted("Acc train"),
        muted("Acc test"),
        muted("F1 train"),
        muted("F1 test")
    );
    println!("  {}", dim(&"─".repeat(64)));
    for r in &table.models {
        println!(
            "  {:<20} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            r.model, r.train.accuracy, r.test.accuracy, r.train.f1_score, r.test.f1_score
        );
    }
    println!();
    if let Some(acc) = table.best_test_accuracy() {
        println!("  {:<20} {}", muted("Best accuracy"), format!("{:.3}", acc).white());
    }
    println!("  {:<20} {}", muted("Models evaluated"), table.len());
    if let Some(best) = table.best_by_f1() {
        step_ok(&format!(
            "Best model by test F1: {} ({:.3})",
            best.model.white().bold(),
            best.test.f1_score
        ));
    }
}

fn print_summary(summary: &PredictionSummary) {
    let bar_width = 40usize;
    let filled = (summary.approval_rate() * bar_width as f64).round() as usize;

    println!();
    println!("  {:<12} {}", muted("Total"), summary.total.to_string().white().bold());
    println!("  {:<12} {}", muted("Approved"), ok(&summary.approved.to_string()));
    println!("  {:<12} {}", muted("Rejected"), summary.rejected.to_string().red());
    println!(
        "  {:<12} {}{} {:.1}%",
        muted("Approval"),
        ok(&"█".repeat(filled)),
        dim(&"░".repeat(bar_width - filled.min(bar_width))),
        summary.approval_rate() * 100.0
    );
    println!();
}

pub fn cmd_info(data_dir: &Path) -> anyhow::Result<()> {
    section("Artifacts");

    let store = ArtifactStore::new(data_dir);
    let files = store.list();
    if files.is_empty() {
        println!("  {}", format!("No artifacts in {}", data_dir.display()).yellow());
        println!();
        return Ok(());
    }
    for f in &files {
        println!("  {:<20} {:>10} bytes", f.name, f.size_bytes);
    }

    let transform = store.load_transform()?;
    section("Transform");
    println!("  {:<14} {}", muted("Fitted at"), transform.fitted_at().to_rfc3339());
    println!("  {:<14} {}", muted("Train rows"), transform.n_samples_seen());
    println!("  {:<14} {}", muted("Numeric"), transform.schema().numeric().join(", "));
    println!("  {:<14} {}", muted("Categorical"), transform.schema().categorical().join(", "));
    println!();
    println!("  {:<4} {}", muted("#"), muted("Output feature"));
    println!("  {}", dim(&"─".repeat(40)));
    for (i, name) in transform.feature_names().iter().enumerate() {
        println!("  {:<4} {}", i, name);
    }
    println!();
    Ok(())
}

pub fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("mlops prepare -d loans.csv -t loan_approved", "Split, fit and save artifacts"),
        ("mlops prepare --features X.csv --labels y.csv", "Same, from separate files"),
        ("mlops baseline", "Majority-class baseline + metrics"),
        ("mlops serve -p 8000", "Start the inference server"),
        ("mlops request -n 1000", "Send synthetic records"),
        ("mlops report", "Model results + predictions summary"),
        ("mlops info", "Inspect saved artifacts"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<48} {}", cmd.white(), muted(desc));
    }
    println!();
}

/// Build the prepare configuration from CLI flags
pub fn prepare_config(
    test_size: f64,
    seed: u64,
    scaler: &str,
    exclude: Vec<String>,
) -> anyhow::Result<PrepareConfig> {
    let mut preprocessing = PreprocessingConfig::new().with_scaler(parse_scaler(scaler)?);
    for column in exclude {
        preprocessing = preprocessing.exclude(column);
    }
    Ok(PrepareConfig::new()
        .with_test_size(test_size)
        .with_seed(seed)
        .with_preprocessing(preprocessing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scaler() {
        assert_eq!(parse_scaler("MinMax").unwrap(), ScalerType::MinMax);
        assert!(parse_scaler("robust").is_err());
    }

    #[test]
    fn test_prepare_config_from_flags() {
        let config = prepare_config(0.3, 7, "none", vec!["loan_id".into()]).unwrap();
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.seed, 7);
        assert_eq!(config.preprocessing.scaler_type, ScalerType::None);
        assert_eq!(config.preprocessing.exclude_columns, vec!["loan_id".to_string()]);
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "hi".red());
        assert_eq!(strip_ansi(&colored), "hi");
    }

    #[test]
    fn test_cli_parses_prepare_with_separate_files() {
        let cli = Cli::try_parse_from([
            "mlops", "prepare", "--features", "X.csv", "--labels", "y.csv", "--seed", "9",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Prepare { features, labels, seed, data, .. }) => {
                assert_eq!(features, Some(PathBuf::from("X.csv")));
                assert_eq!(labels, Some(PathBuf::from("y.csv")));
                assert_eq!(seed, 9);
                assert!(data.is_none());
            }
            _ => panic!("expected prepare"),
        }
    }

    #[test]
    fn test_baseline_results_feed_the_report() {
        use crate::artifacts::ArtifactStore;
        use crate::client::write_predictions;
        use polars::prelude::*;

        let dir = tempfile::tempdir().unwrap();
        let n = 50;
        let df = df!(
            "income" => (0..n).map(|i| 20000.0 + i as f64 * 500.0).collect::<Vec<_>>(),
            "employment_type" => (0..n).map(|i| ["contract", "salaried"][i % 2]).collect::<Vec<_>>(),
        )
        .unwrap();
        let labels = ndarray::Array1::from_vec((0..n).map(|i| (i % 5 < 3) as i64).collect());
        let prepared = prepare_dataset(&df, &labels, &PrepareConfig::new()).unwrap();
        ArtifactStore::new(dir.path()).save_prepared(&prepared).unwrap();

        cmd_baseline(dir.path(), None).unwrap();

        let results = ModelResults::load(dir.path().join(RESULTS_FILE)).unwrap();
        assert_eq!(results.len(), 1);
        let best = results.best_by_f1().unwrap();
        assert_eq!(best.model, "majority_class");
        assert_eq!(best.train.n_samples + best.test.n_samples, n);
        assert!(best.test.accuracy > 0.0);

        // running again replaces the row instead of appending
        cmd_baseline(dir.path(), None).unwrap();
        assert_eq!(ModelResults::load(dir.path().join(RESULTS_FILE)).unwrap().len(), 1);

        let predictions = dir.path().join("predictions.csv");
        let records = crate::client::generate_records(3, 1);
        write_predictions(&records, &[1, 0, 1], &predictions).unwrap();
        cmd_report(&predictions, None).unwrap();
    }

    #[test]
    fn test_report_without_results_file() {
        let dir = tempfile::tempdir().unwrap();
        let predictions = dir.path().join("predictions.csv");
        let records = crate::client::generate_records(2, 1);
        crate::client::write_predictions(&records, &[1, 1], &predictions).unwrap();
        assert!(cmd_report(&predictions, None).is_ok());
    }

    #[test]
    fn test_sibling_results_path() {
        assert_eq!(
            sibling_results(Path::new("data/model.json")),
            PathBuf::from("data").join(RESULTS_FILE)
        );
    }

    #[test]
    fn test_cli_rejects_data_without_target() {
        assert!(Cli::try_parse_from(["mlops", "prepare", "--data", "loans.csv"]).is_err());
    }
}
