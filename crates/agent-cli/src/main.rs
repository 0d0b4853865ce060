//! Command-line interface for agent-rs

use agent_core::{DATE_FORMAT, ResultRecord, TaskKind, TaskSpec, parse_date};
use agent_runtime::{AgentRuntime, RuntimeConfig};
use agent_utils::ProcessEnv;
use agent_workflow::{
    BatchOrchestrator, BatchRequest, DEFAULT_OUTPUT_ROOT, FsOutputStore, MarkdownRenderer,
    OrchestratorConfig, OutputStore, ProcessLauncher, normalize_subject,
};
use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "agent-cli")]
#[command(about = "Run batches of analyst tasks", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Batch operations
    #[command(subcommand)]
    Batch(BatchCommand),
    /// Single-task operations
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Subcommand, Debug)]
enum BatchCommand {
    /// Run every requested task and summarize the results
    Run(BatchRunArgs),
    /// Show which tasks have records for a subject and date
    Status(BatchStatusArgs),
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Run one task and print its record as JSON (used by batch workers)
    Run(TaskRunArgs),
    /// List the known task kinds
    List,
}

#[derive(Args, Debug)]
struct BatchRunArgs {
    /// Subject (ticker symbol)
    #[arg(long)]
    subject: String,
    /// Analysis date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<String>,
    /// Comma-separated task identifiers (default: all)
    #[arg(long, value_delimiter = ',')]
    tasks: Vec<String>,
    /// Output root directory
    #[arg(long, default_value = DEFAULT_OUTPUT_ROOT)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct BatchStatusArgs {
    /// Subject (ticker symbol)
    #[arg(long)]
    subject: String,
    /// Analysis date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<String>,
    /// Output root directory
    #[arg(long, default_value = DEFAULT_OUTPUT_ROOT)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct TaskRunArgs {
    /// Task identifier
    #[arg(long)]
    task: String,
    /// Subject (ticker symbol)
    #[arg(long)]
    subject: String,
    /// Analysis date, YYYY-MM-DD
    #[arg(long)]
    date: String,
    /// Output root directory
    #[arg(long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if cli.json_logs {
        agent_utils::init_tracing_json();
    } else {
        agent_utils::init_tracing();
    }

    match cli.command {
        Command::Batch(BatchCommand::Run(args)) => run_batch(args).await,
        Command::Batch(BatchCommand::Status(args)) => batch_status(args).await,
        Command::Task(TaskCommand::Run(args)) => run_task(args).await,
        Command::Task(TaskCommand::List) => {
            list_tasks();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run_batch(args: BatchRunArgs) -> anyhow::Result<ExitCode> {
    let runtime_config = RuntimeConfig::from_env(&ProcessEnv)?;
    let config = OrchestratorConfig::from_env(&ProcessEnv)?;
    let root = args.output;

    let launcher = ProcessLauncher::current_exe()?.runtime_config(runtime_config);
    let orchestrator = BatchOrchestrator::builder()
        .launcher(Arc::new(launcher))
        .store(Arc::new(FsOutputStore::new(&root)))
        .renderer(Arc::new(MarkdownRenderer::new(&root)))
        .config(config)
        .build()?;

    let request = BatchRequest {
        subject: args.subject,
        as_of: args.date,
        task_ids: args.tasks,
    };

    match orchestrator.run(&request).await {
        Ok(outcome) => {
            println!("{}", outcome.to_table());
            println!("{}", outcome.headline());
            for path in outcome.artifact_paths() {
                println!("  {}", path.display());
            }
            Ok(exit_code(outcome.exit_code()))
        }
        Err(abort) => {
            if let Some(outcome) = &abort.outcome {
                println!("{}", outcome.to_table());
            }
            eprintln!("{abort}");
            Ok(exit_code(abort.exit_code()))
        }
    }
}

async fn run_task(args: TaskRunArgs) -> anyhow::Result<ExitCode> {
    let kind: TaskKind = args.task.parse()?;
    let subject = normalize_subject(&args.subject)?;
    let as_of = parse_date(&args.date)?;
    let spec = TaskSpec::new(kind, subject, as_of);

    let record = match RuntimeConfig::from_env(&ProcessEnv).and_then(AgentRuntime::from_config) {
        Ok(runtime) => runtime.task_runner().run(spec).await,
        Err(e) => {
            error!(task = %kind, error = %e, "Runtime setup failed");
            ResultRecord::failed(kind, spec.subject, as_of, e.to_string())
        }
    };

    let store = FsOutputStore::new(&args.output);
    if let Err(e) = store
        .write(record.subject(), record.as_of(), record.task_id(), &record)
        .await
    {
        error!(task = %kind, error = %e, "Failed to persist record");
    }

    let json = serde_json::to_string(&record).context("serializing result record")?;
    println!("{json}");

    info!(task = %kind, status = %record.status(), "Worker finished");
    Ok(if record.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_tasks() {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Task", "Name", "Description", "Default tools"]);

    for kind in TaskKind::ALL {
        table.add_row(vec![
            kind.id().to_string(),
            kind.display_name().to_string(),
            kind.description().to_string(),
            kind.default_tools().join(", "),
        ]);
    }
    println!("{table}");
}

async fn batch_status(args: BatchStatusArgs) -> anyhow::Result<ExitCode> {
    let subject = normalize_subject(&args.subject)?;
    let as_of = match args.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };

    let store = FsOutputStore::new(&args.output);
    let records = store.list_records(&subject, as_of).await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Task", "Status", "Produced", "Detail"]);

    for kind in TaskKind::ALL {
        let latest = records
            .iter()
            .filter(|r| r.task_id() == kind)
            .max_by_key(|r| r.produced_at());

        let row = match latest {
            Some(record) => vec![
                kind.id().to_string(),
                record.status().to_string(),
                record.produced_at().format("%Y-%m-%d %H:%M:%S").to_string(),
                record.failure_reason().unwrap_or_default().to_string(),
            ],
            None => vec![
                kind.id().to_string(),
                "not run".to_string(),
                String::new(),
                String::new(),
            ],
        };
        table.add_row(row);
    }

    println!("{subject} {}", as_of.format(DATE_FORMAT));
    println!("{table}");
    Ok(ExitCode::SUCCESS)
}
