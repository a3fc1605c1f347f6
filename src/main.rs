//! ThreatLens entrypoint: extract features from security logs, train the
//! threat classifier, build the knowledge graph, analyze alerts through the
//! local model server and render PDF reports.

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use threatlens::{
    config::AppConfig,
    features::{FeatureExtractor, FeatureTable, SOURCE_IP_FIELD},
    knowledge::{build_security_kg, Term},
    logging::{AlertEvent, StructuredLogger},
    model::ThreatClassifier,
    rag::ThreatAnalyzer,
    records::{load_csv, sample_records, LogRecord},
    report::{self, ChartKind, SimpleReport},
    risk::{alert_details, RiskEngine, ThreatAlert},
    storage::TripleStore,
};
use tracing::{info, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const CONFIG_ENV: &str = "THREATLENS_CONFIG_PATH";

#[derive(Parser)]
#[command(name = "threatlens")]
#[command(about = "Security log feature extraction and threat analysis", long_about = None)]
struct Cli {
    /// Config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Log CSV (defaults to the configured input)
    #[arg(short, long, conflicts_with = "sample")]
    input: Option<PathBuf>,

    /// Use the built-in four-record sample
    #[arg(long)]
    sample: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the feature table
    Extract {
        #[command(flatten)]
        input: InputArgs,

        /// One JSON object per row
        #[arg(long)]
        json: bool,
    },

    /// Train the threat classifier and print its held-out report
    Train {
        #[command(flatten)]
        input: InputArgs,

        /// Model artifact path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the security knowledge graph and query it
    Graph {
        /// Turtle output path
        #[arg(long)]
        turtle: Option<PathBuf>,
    },

    /// Analyze a threat alert with retrieval-augmented generation
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Source IP (defaults to the first one seen in the logs)
        #[arg(long)]
        source_ip: Option<String>,

        #[arg(long)]
        threat_type: Option<String>,

        #[arg(long)]
        target: Option<String>,
    },

    /// Render a PDF report
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// Column to chart
        #[arg(long)]
        group_by: Option<String>,

        /// bar or pie
        #[arg(long, default_value = "bar")]
        chart: String,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Per-entry data report instead of the charted one
        #[arg(long)]
        simple: bool,

        /// Only entries where this column is non-empty
        #[arg(long, requires = "simple")]
        criteria: Option<String>,

        /// Print an HTML download link for the report
        #[arg(long)]
        link: bool,
    },
}

fn load_records(config: &AppConfig, input: &InputArgs) -> CliResult<Vec<LogRecord>> {
    if input.sample {
        return Ok(sample_records());
    }
    let path = input.input.as_deref().unwrap_or(&config.records.input_path);
    Ok(load_csv(path, &config.records)?)
}

fn extract_table(config: &AppConfig, records: &[LogRecord]) -> CliResult<FeatureTable> {
    let extractor =
        FeatureExtractor::new(config.features.clone()).with_label_column(config.records.label_column.clone());
    Ok(extractor.extract(records)?)
}

fn row_json(table: &FeatureTable, i: usize) -> Value {
    let row = &table.rows[i];
    let mut obj = Map::new();
    obj.insert("user".into(), Value::from(row.user.as_str()));
    obj.insert(SOURCE_IP_FIELD.into(), Value::from(row.source_ip.as_str()));
    if let Some(label) = &row.label {
        obj.insert(table.label_column.clone(), Value::from(label.as_str()));
    }
    for (name, v) in table.passthrough_columns.iter().zip(&row.passthrough) {
        obj.insert(name.clone(), Value::from(*v));
    }
    for (name, v) in table.indicator_columns().into_iter().zip(&row.indicators) {
        obj.insert(name, Value::from(*v));
    }
    Value::Object(obj)
}

fn run_extract(config: &AppConfig, input: &InputArgs, json: bool) -> CliResult<()> {
    let records = load_records(config, input)?;
    let table = extract_table(config, &records)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        for i in 0..table.len() {
            StructuredLogger::emit_json(&row_json(&table, i), &mut out)?;
        }
        return Ok(());
    }
    let names = table.feature_names();
    let mut header = vec!["user".to_string(), SOURCE_IP_FIELD.to_string()];
    if table.has_column(&table.label_column) {
        header.push(table.label_column.clone());
    }
    header.extend(names.iter().cloned());
    writeln!(out, "{}", header.join("\t"))?;
    for i in 0..table.len() {
        let cells: Vec<String> = header
            .iter()
            .map(|h| table.column(h).map(|c| c[i].clone()).unwrap_or_default())
            .collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    Ok(())
}

fn run_train(config: &AppConfig, input: &InputArgs, output: Option<PathBuf>) -> CliResult<()> {
    let records = load_records(config, input)?;
    let table = extract_table(config, &records)?;
    let (classifier, report) = ThreatClassifier::train(&table, &config.model)?;
    println!("{report}");
    let path = output.unwrap_or_else(|| config.model_path());
    classifier.save(&path)?;
    info!(path = %path.display(), classes = classifier.classes().len(), "model saved");
    Ok(())
}

fn run_graph(config: &AppConfig, turtle: Option<PathBuf>) -> CliResult<()> {
    std::fs::create_dir_all(&config.data_dir)?;
    let graph = build_security_kg();
    let store = TripleStore::open(&config.data_dir.join("knowledge.db"))?;
    let added = store.insert_graph(&graph)?;
    info!(added, total = store.len()?, "knowledge graph stored");

    let stored = store.all()?;
    let actor = Term::security("APT29");
    println!("Techniques used by APT29:");
    for technique in stored.techniques_used_by(&actor) {
        println!("  {technique}");
    }

    let path = turtle.unwrap_or_else(|| config.data_dir.join("security_kg.ttl"));
    std::fs::write(&path, stored.to_turtle())?;
    info!(path = %path.display(), triples = stored.len(), "turtle written");
    Ok(())
}

/// Alerts from the saved classifier, highest confidence first. Empty when
/// no model has been trained yet.
fn classify(config: &AppConfig, table: &FeatureTable) -> CliResult<Vec<ThreatAlert>> {
    let model_path = config.model_path();
    if !model_path.exists() {
        warn!(path = %model_path.display(), "no trained model, analyzing the given alert only");
        return Ok(Vec::new());
    }
    let classifier = ThreatClassifier::load(&model_path)?;
    let predictions = classifier.predict_table(table);
    let mut alerts = RiskEngine::new(config.risk.clone()).alerts(table, &predictions);
    alerts.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(alerts)
}

fn run_analyze(
    config: &AppConfig,
    input: &InputArgs,
    source_ip: Option<String>,
    threat_type: Option<String>,
    target: Option<String>,
) -> CliResult<()> {
    let records = load_records(config, input)?;
    let table = extract_table(config, &records)?;
    let alerts = if source_ip.is_none() && threat_type.is_none() {
        classify(config, &table)?
    } else {
        Vec::new()
    };

    let details = match alerts.first() {
        Some(alert) => alert.details(target.as_deref()),
        None => {
            let ip = source_ip
                .or_else(|| table.distinct(SOURCE_IP_FIELD).and_then(|v| v.into_iter().next()))
                .ok_or("no source IP in the logs; pass --source-ip")?;
            alert_details(
                threat_type.as_deref().unwrap_or("brute_force"),
                &ip,
                target.as_deref().unwrap_or("admin account"),
            )
        }
    };

    let analyzer = ThreatAnalyzer::setup(&config.rag)?;
    let analysis = analyzer.query(&details)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (i, alert) in alerts.iter().enumerate() {
        let event = AlertEvent::new(alert, Utc::now());
        let event = if i == 0 { event.with_analysis(&analysis.answer) } else { event };
        StructuredLogger::emit_json(&event, &mut out)?;
    }
    if alerts.is_empty() {
        writeln!(out, "{details}\n\n{}", analysis.answer)?;
    }
    info!(sources = analysis.sources.len(), "analysis complete");
    Ok(())
}

fn write_pdf(bytes: &[u8], path: &Path, link: bool) -> CliResult<()> {
    report::write_report(path, bytes)?;
    if link {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.pdf".to_string());
        println!("{}", report::download_link(bytes, &name));
    }
    Ok(())
}

struct ReportArgs {
    group_by: Option<String>,
    chart: String,
    output: Option<PathBuf>,
    simple: bool,
    criteria: Option<String>,
    link: bool,
}

fn run_report(config: &AppConfig, input: &InputArgs, args: ReportArgs) -> CliResult<()> {
    let records = load_records(config, input)?;
    if args.simple {
        return match report::generate_simple_report(&records, &config.records, args.criteria.as_deref()) {
            SimpleReport::NoData(message) => {
                println!("{message}");
                Ok(())
            }
            SimpleReport::Pdf(bytes) => {
                let path = args.output.unwrap_or_else(|| config.report.simple_output_path.clone());
                write_pdf(&bytes, &path, args.link)
            }
        };
    }
    let table = extract_table(config, &records)?;
    let bytes = report::generate_report_with_chart(
        &records,
        &table,
        args.group_by.as_deref(),
        ChartKind::parse(&args.chart),
        Local::now().naive_local(),
    )?;
    let path = args.output.unwrap_or_else(|| config.report.output_path.clone());
    write_pdf(&bytes, &path, args.link)
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("threatlens.json"));
    let config = AppConfig::load(&config_path);

    let level = if cli.debug { "debug" } else { config.log.level.as_str() };
    StructuredLogger::init(config.log.json, level);
    info!(config = %config_path.display(), data_dir = ?config.data_dir, "threatlens starting");

    let result = match cli.command {
        Commands::Extract { input, json } => run_extract(&config, &input, json),
        Commands::Train { input, output } => {
            std::fs::create_dir_all(&config.data_dir)?;
            run_train(&config, &input, output)
        }
        Commands::Graph { turtle } => run_graph(&config, turtle),
        Commands::Analyze {
            input,
            source_ip,
            threat_type,
            target,
        } => run_analyze(&config, &input, source_ip, threat_type, target),
        Commands::Report {
            input,
            group_by,
            chart,
            output,
            simple,
            criteria,
            link,
        } => run_report(
            &config,
            &input,
            ReportArgs {
                group_by,
                chart,
                output,
                simple,
                criteria,
                link,
            },
        ),
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}
