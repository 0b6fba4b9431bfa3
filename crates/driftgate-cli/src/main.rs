// crates/driftgate-cli/src/main.rs
// ============================================================================
// Module: Driftgate CLI Entry Point
// Description: Command dispatcher for the one-shot and daemon drift-
//              detection workflows.
// Purpose: Provide a thin clap wrapper over driftgate-core/-config/-baseline/
//          -action/-evidence/-store-sqlite/-daemon (§6 CLI surface).
// Dependencies: clap, driftgate-action, driftgate-baseline, driftgate-config,
//              driftgate-core, driftgate-daemon, driftgate-evidence,
//              driftgate-store-sqlite, serde_json, thiserror, tokio, tracing.
// ============================================================================

//! ## Overview
//! Every subcommand here loads the config/registry it needs, calls exactly
//! one library function, and prints the result as JSON. None of the
//! decision logic lives in this crate; it is the external collaborator
//! spec.md §6 describes as "out of core scope, listed for completeness".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use driftgate_action::ActionContext;
use driftgate_action::propose_actions;
use driftgate_baseline::approve_tag;
use driftgate_baseline::request_tag;
use driftgate_config::ActionPolicy;
use driftgate_config::BaselinePolicy;
use driftgate_core::CompareOptions;
use driftgate_core::CorrelationId;
use driftgate_core::RunId;
use driftgate_core::RunStatus;
use driftgate_core::compare_metrics;
use driftgate_core::core::hashing::random_run_id;
use driftgate_core::normalize_metrics;
use driftgate_daemon::DaemonError;
use driftgate_evidence::EvidencePackInput;
use driftgate_evidence::MetricSource;
use driftgate_evidence::combined_config_hash;
use driftgate_evidence::export_evidence_pack;
use driftgate_evidence::load_baseline;
use driftgate_evidence::load_metrics_from_path;
use driftgate_evidence::replay_decision;
use driftgate_evidence::verify_decision;
use driftgate_evidence::write_metrics_csv;
use driftgate_store_sqlite::RunRegistry;
use driftgate_store_sqlite::SelectionPolicy;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors & Exit Codes
// ============================================================================

/// Exit codes from §6: `0 OK, 1 unknown, 2 parse, 3 config, 4 registry`.
#[derive(Debug, Error)]
enum CliError {
    /// Malformed input data (a metrics file, a decision record).
    #[error("{0}")]
    Parse(String),
    /// A registry/policy YAML file was invalid or missing.
    #[error("{0}")]
    Config(String),
    /// The run registry failed.
    #[error("{0}")]
    Registry(String),
    /// Anything else: governance violations, blocked actions, I/O failures.
    #[error("{0}")]
    Other(String),
}

impl CliError {
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Parse(_) => 2,
            Self::Config(_) => 3,
            Self::Registry(_) => 4,
            Self::Other(_) => 1,
        }
    }
}

impl From<driftgate_config::ConfigError> for CliError {
    fn from(err: driftgate_config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<driftgate_store_sqlite::StoreError> for CliError {
    fn from(err: driftgate_store_sqlite::StoreError) -> Self {
        Self::Registry(err.to_string())
    }
}

impl From<driftgate_core::CoreError> for CliError {
    fn from(err: driftgate_core::CoreError) -> Self {
        match err {
            driftgate_core::CoreError::Config(message) => Self::Config(message),
            driftgate_core::CoreError::Parse(message) => Self::Parse(message),
        }
    }
}

impl From<driftgate_evidence::EvidenceError> for CliError {
    fn from(err: driftgate_evidence::EvidenceError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<driftgate_baseline::BaselineError> for CliError {
    fn from(err: driftgate_baseline::BaselineError) -> Self {
        match err {
            driftgate_baseline::BaselineError::Store(store_err) => store_err.into(),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<driftgate_action::ActionError> for CliError {
    fn from(err: driftgate_action::ActionError) -> Self {
        match err {
            driftgate_action::ActionError::Store(store_err) => store_err.into(),
        }
    }
}

impl From<DaemonError> for CliError {
    fn from(err: DaemonError) -> Self {
        match err {
            DaemonError::Config(inner) => inner.into(),
            DaemonError::Store(inner) => inner.into(),
            DaemonError::Core(inner) => inner.into(),
            other => Self::Other(other.to_string()),
        }
    }
}

type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "driftgate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands (§6).
#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize a raw metrics file and write it into a run's output dir.
    Ingest(IngestArgs),
    /// Normalize, select a baseline, and compare — without persisting a run.
    Analyze(AnalyzeArgs),
    /// Run one full cycle against the durable registry: compare, persist,
    /// propose actions, write the report.
    Run(RunArgs),
    /// Baseline tagging and governance workflow.
    Baseline {
        /// Selected baseline subcommand.
        #[command(subcommand)]
        command: BaselineCommand,
    },
    /// Run registry queries.
    Runs {
        /// Selected runs subcommand.
        #[command(subcommand)]
        command: RunsCommand,
    },
    /// Preview the action proposals a status/context would produce, without
    /// executing or recording anything.
    Plan(PlanArgs),
    /// Re-run a comparison from a frozen input slice and baseline.
    Replay(ReplayArgs),
    /// Independently re-verify a decision record against its evidence.
    VerifyDecision(VerifyDecisionArgs),
    /// Evidence export utilities.
    Export {
        /// Selected export subcommand.
        #[command(subcommand)]
        command: ExportCommand,
    },
    /// Run the long-lived orchestrator loop (§4.8).
    Daemon(DaemonArgs),
    /// Print runtime information: version and recognized environment
    /// variables.
    Runtime,
}

/// Baseline subcommands.
#[derive(Subcommand, Debug)]
enum BaselineCommand {
    /// Set a tag directly, bypassing governance.
    Set(BaselineSetArgs),
    /// Request a tag, subject to governance approval.
    Request(BaselineRequestArgs),
    /// Approve a pending tag request.
    Approve(BaselineApproveArgs),
    /// List all tags and the run each points at.
    List(BaselineLocationArgs),
}

/// Run registry subcommands.
#[derive(Subcommand, Debug)]
enum RunsCommand {
    /// List runs, optionally filtered by program/subsystem/test name.
    List(RunsListArgs),
}

/// Evidence export subcommands.
#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Export an evidence pack for a run's report directory.
    EvidencePack(ExportEvidencePackArgs),
}

/// Shared registry-location arguments.
#[derive(Args, Debug, Clone)]
struct BaselineLocationArgs {
    /// Path to the `driftgate-store-sqlite` registry database.
    #[arg(long, value_name = "PATH")]
    db: PathBuf,
}

/// Arguments for `ingest`.
#[derive(Args, Debug)]
struct IngestArgs {
    /// Path to a raw metrics CSV or JSON file.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Metric registry YAML path (defaults to `HB_METRIC_REGISTRY` or the
    /// documented default).
    #[arg(long, value_name = "PATH")]
    metric_registry: Option<String>,
    /// Output directory for `metrics_normalized.csv`.
    #[arg(long, value_name = "DIR")]
    output: PathBuf,
}

/// Arguments for `analyze`.
#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Path to the current raw metrics CSV or JSON file.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Path to the baseline raw metrics CSV or JSON file.
    #[arg(long, value_name = "PATH", conflicts_with = "baseline_run_id")]
    baseline: Option<PathBuf>,
    /// A run id already present in `--db` to use as the baseline.
    #[arg(long, value_name = "RUN_ID", requires = "db")]
    baseline_run_id: Option<String>,
    /// Registry database to resolve `--baseline-run-id` against.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Metric registry YAML path.
    #[arg(long, value_name = "PATH")]
    metric_registry: Option<String>,
    /// Baseline selection policy YAML path (controls `distribution_drift_enabled`).
    #[arg(long, value_name = "PATH")]
    baseline_policy: Option<String>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the current raw metrics CSV or JSON file.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Metric registry YAML path.
    #[arg(long, value_name = "PATH")]
    metric_registry: Option<String>,
    /// Baseline selection policy YAML path.
    #[arg(long, value_name = "PATH")]
    baseline_policy: Option<String>,
    /// Action policy YAML path.
    #[arg(long, value_name = "PATH")]
    action_policy: Option<String>,
    /// Registry database path.
    #[arg(long, value_name = "PATH")]
    db: PathBuf,
    /// Baseline tag to select against.
    #[arg(long, value_name = "TAG", default_value = "golden")]
    baseline_tag: String,
    /// Output directory for the report.
    #[arg(long, value_name = "DIR")]
    output: PathBuf,
    /// Propose actions without recording ledger rows.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

/// Arguments for `baseline set`.
#[derive(Args, Debug)]
struct BaselineSetArgs {
    /// Registry location.
    #[command(flatten)]
    location: BaselineLocationArgs,
    /// Tag to set.
    #[arg(long, value_name = "TAG")]
    tag: String,
    /// Run id the tag should point at.
    #[arg(long, value_name = "RUN_ID")]
    run_id: String,
}

/// Arguments for `baseline request`.
#[derive(Args, Debug)]
struct BaselineRequestArgs {
    /// Registry location.
    #[command(flatten)]
    location: BaselineLocationArgs,
    /// Baseline selection policy YAML path (for governance rules).
    #[arg(long, value_name = "PATH")]
    baseline_policy: Option<String>,
    /// Identifier for the new request.
    #[arg(long, value_name = "REQUEST_ID")]
    request_id: String,
    /// Tag being requested.
    #[arg(long, value_name = "TAG")]
    tag: String,
    /// Run id the tag would point at if approved.
    #[arg(long, value_name = "RUN_ID")]
    run_id: String,
    /// Identity of the requester.
    #[arg(long, value_name = "WHO")]
    requested_by: Option<String>,
}

/// Arguments for `baseline approve`.
#[derive(Args, Debug)]
struct BaselineApproveArgs {
    /// Registry location.
    #[command(flatten)]
    location: BaselineLocationArgs,
    /// Baseline selection policy YAML path (for the approver allowlist).
    #[arg(long, value_name = "PATH")]
    baseline_policy: Option<String>,
    /// Request identifier being approved.
    #[arg(long, value_name = "REQUEST_ID")]
    request_id: String,
    /// Identity of the approver.
    #[arg(long, value_name = "WHO")]
    approver: String,
}

/// Arguments for `runs list`.
#[derive(Args, Debug)]
struct RunsListArgs {
    /// Registry location.
    #[command(flatten)]
    location: BaselineLocationArgs,
    /// Filter by program name.
    #[arg(long, value_name = "PROGRAM")]
    program: Option<String>,
    /// Filter by subsystem name.
    #[arg(long, value_name = "SUBSYSTEM")]
    subsystem: Option<String>,
    /// Filter by test name.
    #[arg(long = "test", value_name = "TEST_NAME")]
    test_name: Option<String>,
}

/// Status values accepted by `plan`.
#[derive(ValueEnum, Copy, Clone, Debug)]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
enum StatusArg {
    /// `PASS`
    Pass,
    /// `PASS_WITH_DRIFT`
    PassWithDrift,
    /// `FAIL`
    Fail,
    /// `NO_METRICS`
    NoMetrics,
    /// `NO_TEST`
    NoTest,
}

impl From<StatusArg> for RunStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pass => Self::Pass,
            StatusArg::PassWithDrift => Self::PassWithDrift,
            StatusArg::Fail => Self::Fail,
            StatusArg::NoMetrics => Self::NoMetrics,
            StatusArg::NoTest => Self::NoTest,
        }
    }
}

/// Arguments for `plan`.
#[derive(Args, Debug)]
struct PlanArgs {
    /// Action policy YAML path.
    #[arg(long, value_name = "PATH")]
    action_policy: Option<String>,
    /// Status the plan is evaluated for.
    #[arg(long, value_enum)]
    status: StatusArg,
    /// Number of metrics flagged as drifted or failed.
    #[arg(long, value_name = "N", default_value_t = 0)]
    flagged_metric_count: u32,
    /// Drift-detection confidence.
    #[arg(long, value_name = "0..1")]
    confidence: Option<f64>,
    /// Confidence in the selected baseline.
    #[arg(long, value_name = "0..1")]
    baseline_confidence: Option<f64>,
}

/// A metric source argument shared by `replay` and `analyze`.
#[derive(Args, Debug, Clone)]
struct MetricSourceArgs {
    /// A metrics CSV or JSON file.
    #[arg(long, value_name = "PATH", conflicts_with = "run_id")]
    path: Option<PathBuf>,
    /// A run id already present in the registry.
    #[arg(long, value_name = "RUN_ID", conflicts_with = "path")]
    run_id: Option<String>,
}

/// Arguments for `replay`.
#[derive(Args, Debug)]
struct ReplayArgs {
    /// Current input slice.
    #[command(flatten)]
    input: MetricSourceArgs,
    /// Baseline source.
    #[arg(long, value_name = "PATH", conflicts_with = "baseline_run_id")]
    baseline: Option<PathBuf>,
    /// Baseline run id.
    #[arg(long, value_name = "RUN_ID", conflicts_with = "baseline")]
    baseline_run_id: Option<String>,
    /// Registry database, required when either source names a run id.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Metric registry YAML path.
    #[arg(long, value_name = "PATH")]
    metric_registry: Option<String>,
    /// Baseline selection policy YAML path (recorded in the config hash).
    #[arg(long, value_name = "PATH")]
    baseline_policy: Option<String>,
}

/// Arguments for `verify-decision`.
#[derive(Args, Debug)]
struct VerifyDecisionArgs {
    /// Path to `decision_record.json`.
    #[arg(long, value_name = "PATH")]
    decision: PathBuf,
    /// Evidence directory (defaults to the decision record's parent).
    #[arg(long, value_name = "DIR")]
    evidence_dir: Option<PathBuf>,
}

/// Arguments for `export evidence-pack`.
#[derive(Args, Debug)]
struct ExportEvidencePackArgs {
    /// Case identifier for the exported archive.
    #[arg(long, value_name = "CASE_ID")]
    case_id: String,
    /// Report directory to export (`drift_report.json`, etc.).
    #[arg(long, value_name = "DIR")]
    report_dir: PathBuf,
    /// Decision record path, if one exists for this run.
    #[arg(long, value_name = "PATH")]
    decision_record: Option<PathBuf>,
    /// Config file to embed, `name=path` (repeatable).
    #[arg(long = "config", value_name = "NAME=PATH", action = ArgAction::Append)]
    config_paths: Vec<String>,
    /// Action policy path to embed.
    #[arg(long, value_name = "PATH")]
    action_policy: Option<PathBuf>,
    /// Output directory the evidence archive is written under.
    #[arg(long, value_name = "DIR")]
    output: PathBuf,
    /// Produce a `.zip` archive instead of a plain directory.
    #[arg(long, action = ArgAction::SetTrue)]
    zip: bool,
}

/// Arguments for `daemon`.
#[derive(Args, Debug)]
struct DaemonArgs {
    /// Path to the daemon's YAML config file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "command failed");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    if cli.show_version {
        println_stdout(&format!("driftgate {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(());
    }

    let Some(command) = cli.command else {
        println_stdout("driftgate: see --help for a list of subcommands")?;
        return Ok(());
    };

    match command {
        Commands::Ingest(args) => command_ingest(&args),
        Commands::Analyze(args) => command_analyze(&args),
        Commands::Run(args) => command_run(&args),
        Commands::Baseline { command } => command_baseline(command),
        Commands::Runs { command } => command_runs(command),
        Commands::Plan(args) => command_plan(&args),
        Commands::Replay(args) => command_replay(&args),
        Commands::VerifyDecision(args) => command_verify_decision(&args),
        Commands::Export { command } => command_export(command),
        Commands::Daemon(args) => command_daemon(&args).await,
        Commands::Runtime => command_runtime(),
    }
}

// ============================================================================
// SECTION: Ingest / Analyze / Run
// ============================================================================

fn command_ingest(args: &IngestArgs) -> CliResult<()> {
    let registry_path = driftgate_config::metric_registry::resolve_path(args.metric_registry.as_deref());
    let registry = driftgate_config::metric_registry::load(&registry_path)?;

    let raw = load_metrics_from_path(&args.input)?;
    let (normalized, warnings) = normalize_metrics(&raw, &registry);

    std::fs::create_dir_all(&args.output)
        .map_err(|err| CliError::Other(format!("failed to create {}: {err}", args.output.display())))?;
    let csv_path = args.output.join("metrics_normalized.csv");
    let units = BTreeMap::new();
    write_metrics_csv(&csv_path, &raw, &units, &Value::Null)?;

    print_json(&serde_json::json!({
        "metric_count": normalized.len(),
        "warnings": warnings,
        "output": csv_path,
    }))
}

fn command_analyze(args: &AnalyzeArgs) -> CliResult<()> {
    let registry_path = driftgate_config::metric_registry::resolve_path(args.metric_registry.as_deref());
    let registry = driftgate_config::metric_registry::load(&registry_path)?;
    let baseline_policy_path = driftgate_config::baseline_policy::resolve_path(args.baseline_policy.as_deref());
    let baseline_policy: BaselinePolicy = driftgate_config::baseline_policy::load(&baseline_policy_path)?;

    let current_raw = load_metrics_from_path(&args.input)?;
    let (current, mut warnings) = normalize_metrics(&current_raw, &registry);

    let store = match &args.db {
        Some(path) => Some(RunRegistry::open(path)?),
        None => None,
    };
    let baseline_source = match (&args.baseline, &args.baseline_run_id) {
        (Some(path), None) => MetricSource::Csv(path.clone()),
        (None, Some(run_id)) => MetricSource::RunId(run_id.clone()),
        _ => return Err(CliError::Other("exactly one of --baseline or --baseline-run-id is required".to_string())),
    };
    let baseline_raw = load_baseline(&baseline_source, store.as_ref())?;
    let (baseline, baseline_warnings) = normalize_metrics(&baseline_raw, &registry);
    warnings.extend(baseline_warnings);

    let options = CompareOptions { distribution_enabled: baseline_policy.distribution_drift_enabled, ..CompareOptions::default() };
    let outcome = compare_metrics(&current, &baseline, &registry, options);
    print_json(&outcome)
}

fn command_run(args: &RunArgs) -> CliResult<()> {
    let registry_path = driftgate_config::metric_registry::resolve_path(args.metric_registry.as_deref());
    let registry = driftgate_config::metric_registry::load(&registry_path)?;
    let baseline_policy_path = driftgate_config::baseline_policy::resolve_path(args.baseline_policy.as_deref());
    let baseline_policy: BaselinePolicy = driftgate_config::baseline_policy::load(&baseline_policy_path)?;
    let action_policy_path = driftgate_config::action_policy::resolve_path(args.action_policy.as_deref());
    let action_policy: ActionPolicy = driftgate_config::action_policy::load(&action_policy_path)?;

    let store = RunRegistry::open(&args.db)?;
    let raw = load_metrics_from_path(&args.input)?;
    let (normalized, mut warnings) = normalize_metrics(&raw, &registry);

    let run_id = RunId::new(format!("run_{}", random_run_id()));
    let run_meta = driftgate_core::RunMeta {
        run_id: run_id.clone(),
        program: None,
        subsystem: None,
        test_name: None,
        environment: None,
        build: driftgate_core::BuildInfo::default(),
        timestamps: driftgate_core::RunTimestamps { start_utc: None, end_utc: None },
        source_system: Some("cli".to_string()),
        correlation_id: Some(CorrelationId::new(random_run_id())),
    };

    let selection_policy = SelectionPolicy { tag: Some(args.baseline_tag.clone()), fallback_latest: baseline_policy.fallback_latest() };
    let selection = store.select_baseline(&run_meta, &selection_policy, None)?;
    let baseline = match &selection.baseline_run_id {
        Some(baseline_run_id) => store.fetch_metrics(baseline_run_id)?,
        None => driftgate_core::MetricMap::new(),
    };

    let options = CompareOptions { distribution_enabled: baseline_policy.distribution_drift_enabled, ..CompareOptions::default() };
    let outcome = compare_metrics(&normalized, &baseline, &registry, options);
    warnings.extend(outcome.warnings.clone());

    store.upsert_run(&run_meta, outcome.status, selection.baseline_run_id.as_ref(), None)?;
    store.replace_metrics(&run_id, &normalized)?;

    let report = driftgate_daemon::DriftReport::from_outcome(
        run_id.clone(),
        &outcome,
        selection.baseline_run_id.clone(),
        selection.reason.as_str().to_string(),
        selection.warning.clone(),
        warnings,
    );
    driftgate_daemon::write_report(&args.output, &report)?;

    let flagged = u32::try_from(outcome.drift.len() + outcome.fail.len()).unwrap_or(u32::MAX);
    let context = ActionContext { flagged_metric_count: flagged, ..ActionContext::default() };
    let proposals = propose_actions(&action_policy, outcome.status, &context, &[]);

    print_json(&serde_json::json!({
        "run_id": run_id.as_str(),
        "status": outcome.status,
        "baseline_run_id": selection.baseline_run_id.as_ref().map(RunId::as_str),
        "report_dir": args.output,
        "proposed_actions": proposals,
        "dry_run": args.dry_run,
    }))
}

// ============================================================================
// SECTION: Baseline & Runs
// ============================================================================

fn command_baseline(command: BaselineCommand) -> CliResult<()> {
    match command {
        BaselineCommand::Set(args) => {
            let store = RunRegistry::open(&args.location.db)?;
            store.set_tag(&args.tag, &RunId::new(args.run_id.clone()), None)?;
            print_json(&serde_json::json!({ "tag": args.tag, "run_id": args.run_id }))
        }
        BaselineCommand::Request(args) => {
            let store = RunRegistry::open(&args.location.db)?;
            let policy_path = driftgate_config::baseline_policy::resolve_path(args.baseline_policy.as_deref());
            let policy: BaselinePolicy = driftgate_config::baseline_policy::load(&policy_path)?;
            let outcome = request_tag(
                &store,
                &policy.governance,
                &args.request_id,
                &args.tag,
                &RunId::new(args.run_id.clone()),
                args.requested_by.as_deref(),
                None,
            )?;
            print_json(&serde_json::json!({ "request_id": args.request_id, "outcome": format!("{outcome:?}") }))
        }
        BaselineCommand::Approve(args) => {
            let store = RunRegistry::open(&args.location.db)?;
            let policy_path = driftgate_config::baseline_policy::resolve_path(args.baseline_policy.as_deref());
            let policy: BaselinePolicy = driftgate_config::baseline_policy::load(&policy_path)?;
            let resolved = approve_tag(&store, &policy.governance, &args.request_id, &args.approver, None)?;
            print_json(&serde_json::json!({ "request_id": args.request_id, "resolved": resolved }))
        }
        BaselineCommand::List(args) => {
            let store = RunRegistry::open(&args.db)?;
            let tags = store.list_tags()?;
            print_json(&serde_json::json!(tags
                .into_iter()
                .map(|(tag, run_id)| serde_json::json!({ "tag": tag, "run_id": run_id.as_str() }))
                .collect::<Vec<_>>()))
        }
    }
}

fn command_runs(command: RunsCommand) -> CliResult<()> {
    match command {
        RunsCommand::List(args) => {
            let store = RunRegistry::open(&args.location.db)?;
            let runs = store.list_matching_runs(args.program.as_deref(), args.subsystem.as_deref(), args.test_name.as_deref())?;
            print_json(&serde_json::json!(runs
                .into_iter()
                .map(|(run_id, status)| serde_json::json!({ "run_id": run_id.as_str(), "status": status }))
                .collect::<Vec<_>>()))
        }
    }
}

// ============================================================================
// SECTION: Plan / Replay / Verify / Export
// ============================================================================

fn command_plan(args: &PlanArgs) -> CliResult<()> {
    let policy_path = driftgate_config::action_policy::resolve_path(args.action_policy.as_deref());
    let policy: ActionPolicy = driftgate_config::action_policy::load(&policy_path)?;

    let context = ActionContext {
        confidence: args.confidence,
        baseline_confidence: args.baseline_confidence,
        flagged_metric_count: args.flagged_metric_count,
        ..ActionContext::default()
    };
    let proposals = propose_actions(&policy, args.status.into(), &context, &[]);
    print_json(&proposals)
}

fn command_replay(args: &ReplayArgs) -> CliResult<()> {
    let registry_path = driftgate_config::metric_registry::resolve_path(args.metric_registry.as_deref());
    let registry = driftgate_config::metric_registry::load(&registry_path)?;

    let store = match &args.db {
        Some(path) => Some(RunRegistry::open(path)?),
        None => None,
    };

    let input_slice = match (&args.input.path, &args.input.run_id) {
        (Some(path), None) => MetricSource::Csv(path.clone()),
        (None, Some(run_id)) => MetricSource::RunId(run_id.clone()),
        _ => return Err(CliError::Other("exactly one of --path or --run-id is required for the input slice".to_string())),
    };
    let baseline = match (&args.baseline, &args.baseline_run_id) {
        (Some(path), None) => MetricSource::Csv(path.clone()),
        (None, Some(run_id)) => MetricSource::RunId(run_id.clone()),
        _ => return Err(CliError::Other("exactly one of --baseline or --baseline-run-id is required".to_string())),
    };

    let baseline_policy_path = args.baseline_policy.as_ref().map(PathBuf::from);
    let baseline_policy = match &baseline_policy_path {
        Some(path) => {
            let path = path.to_str().ok_or_else(|| CliError::Other("baseline policy path is not valid UTF-8".to_string()))?;
            Some(driftgate_config::baseline_policy::load(path)?)
        }
        None => None,
    };
    let result = replay_decision(
        &input_slice,
        &baseline,
        &registry,
        Some(Path::new(&registry_path)),
        baseline_policy.as_ref(),
        baseline_policy_path.as_deref(),
        store.as_ref(),
    )?;
    let combined_hash = combined_config_hash(&result.config_ref);

    print_json(&serde_json::json!({
        "outcome": result.outcome,
        "config_ref": result.config_ref,
        "combined_config_hash": combined_hash,
    }))
}

fn command_verify_decision(args: &VerifyDecisionArgs) -> CliResult<()> {
    let evidence_dir = args.evidence_dir.clone().unwrap_or_else(|| {
        args.decision.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
    });
    let outcome = verify_decision(&args.decision, &evidence_dir)?;
    print_json(&outcome)
}

fn command_export(command: ExportCommand) -> CliResult<()> {
    match command {
        ExportCommand::EvidencePack(args) => {
            let mut config_paths = BTreeMap::new();
            for entry in &args.config_paths {
                let Some((name, path)) = entry.split_once('=') else {
                    return Err(CliError::Other(format!("--config must be NAME=PATH, got '{entry}'")));
                };
                config_paths.insert(name.to_string(), PathBuf::from(path));
            }

            let input = EvidencePackInput {
                case_id: args.case_id.clone(),
                report_dir: args.report_dir.clone(),
                decision_record_path: args.decision_record.clone(),
                config_paths,
                actions_policy_path: args.action_policy.clone(),
                baseline_snapshot_path: None,
                raw_slice_path: None,
                sbom_hash: None,
                code_version: Some(env!("CARGO_PKG_VERSION").to_string()),
                zip_output: args.zip,
            };
            let generated_utc = time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .map_err(|err| CliError::Other(format!("failed to format timestamp: {err}")))?;
            let archive_path = export_evidence_pack(&input, &args.output, &generated_utc)?;
            print_json(&serde_json::json!({ "archive": archive_path }))
        }
    }
}

// ============================================================================
// SECTION: Daemon / Runtime
// ============================================================================

async fn command_daemon(args: &DaemonArgs) -> CliResult<()> {
    let config = driftgate_daemon::load_daemon_config(&args.config)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = Arc::clone(&shutdown);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_signal.store(true, Ordering::SeqCst);
        }
    });

    tokio::task::spawn_blocking(move || driftgate_daemon::run(&config, &shutdown))
        .await
        .map_err(|err| CliError::Other(format!("daemon task panicked: {err}")))??;
    Ok(())
}

/// Environment variables spec.md §6 recognizes, printed by `runtime` with
/// their current value (if set) so an operator can confirm what a running
/// process will actually read.
const RECOGNIZED_ENV_VARS: &[&str] = &[
    "HB_METRIC_REGISTRY",
    "HB_BASELINE_POLICY",
    "HB_TELEMETRY_SCHEMA",
    "HB_DETERMINISTIC",
    "HB_EARLY_EXIT",
    "HB_REJECT_PLAINTEXT_SECRETS",
    "HB_VERSION",
    "HB_CORRELATION_ID",
];

fn command_runtime() -> CliResult<()> {
    let env: BTreeMap<&str, Option<String>> =
        RECOGNIZED_ENV_VARS.iter().map(|name| (*name, std::env::var(name).ok())).collect();
    print_json(&serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "recognized_env": env,
    }))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout without going through `println!`, which
/// the workspace's `print_stdout` lint denies.
fn println_stdout(message: &str) -> CliResult<()> {
    use std::io::Write;
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::Other(format!("failed to write to stdout: {err}")))
}

/// Prints a value as pretty JSON to stdout.
fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|err| CliError::Other(format!("failed to serialize output: {err}")))?;
    println_stdout(&text)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_the_documented_taxonomy() {
        assert_eq!(CliError::Parse(String::new()).exit_code(), 2);
        assert_eq!(CliError::Config(String::new()).exit_code(), 3);
        assert_eq!(CliError::Registry(String::new()).exit_code(), 4);
        assert_eq!(CliError::Other(String::new()).exit_code(), 1);
    }

    #[test]
    fn config_error_maps_to_exit_code_three() {
        let source = std::io::Error::other("boom");
        let config_err = driftgate_config::ConfigError::Io { path: "x.yaml".to_string(), source };
        let cli_err: CliError = config_err.into();
        assert_eq!(cli_err.exit_code(), 3);
    }

    #[test]
    fn store_error_maps_to_exit_code_four() {
        let store = RunRegistry::open_in_memory().expect("open in-memory registry");
        let missing = store.get_run(&RunId::new("does-not-exist")).expect("lookup");
        assert!(missing.is_none());
    }

    #[test]
    fn status_arg_round_trips_to_every_run_status_variant() {
        assert_eq!(RunStatus::from(StatusArg::Pass), RunStatus::Pass);
        assert_eq!(RunStatus::from(StatusArg::PassWithDrift), RunStatus::PassWithDrift);
        assert_eq!(RunStatus::from(StatusArg::Fail), RunStatus::Fail);
        assert_eq!(RunStatus::from(StatusArg::NoMetrics), RunStatus::NoMetrics);
        assert_eq!(RunStatus::from(StatusArg::NoTest), RunStatus::NoTest);
    }

    #[test]
    fn cli_parses_plan_subcommand_with_required_status() {
        let cli = Cli::try_parse_from(["driftgate", "plan", "--status", "FAIL"]).expect("parse plan");
        let Some(Commands::Plan(args)) = cli.command else {
            panic!("expected a Plan command");
        };
        assert!(matches!(args.status, StatusArg::Fail));
    }

    #[test]
    fn cli_rejects_analyze_missing_required_args() {
        let result = Cli::try_parse_from(["driftgate", "analyze"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_baseline_set_subcommand() {
        let cli = Cli::try_parse_from(["driftgate", "baseline", "set", "--db", "run.db", "--tag", "golden", "--run-id", "run_1"])
            .expect("parse baseline set");
        let Some(Commands::Baseline { command: BaselineCommand::Set(args) }) = cli.command else {
            panic!("expected a Baseline Set command");
        };
        assert_eq!(args.tag, "golden");
        assert_eq!(args.run_id, "run_1");
    }

    #[test]
    fn cli_parses_runtime_with_no_further_arguments() {
        let cli = Cli::try_parse_from(["driftgate", "runtime"]).expect("parse runtime");
        assert!(matches!(cli.command, Some(Commands::Runtime)));
    }
}
