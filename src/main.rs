use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use procmill::config::SchedulerConfig;
use procmill::scheduler::{JobScheduler, RunReport, Task};
use procmill::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "procmill")]
#[command(version)]
#[command(about = "Run commands in parallel with bounded concurrency")]
struct Args {
    /// Commands to run (each is passed to `sh -c`)
    commands: Vec<String>,

    /// File with one command per line; blank lines and #-comments are skipped
    #[arg(long, short = 'f')]
    jobs_file: Option<PathBuf>,

    /// Maximum number of concurrently running jobs (0 = logical CPU count)
    #[arg(long, short = 'w', default_value = "0")]
    workers: usize,

    /// Pause between dispatch attempts, in milliseconds
    #[arg(long, default_value = "100")]
    poll_interval_ms: u64,

    /// Finished-job threshold that triggers window compaction
    #[arg(long, default_value = "10")]
    max_tracked: usize,

    /// Output format for the final report
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut commands = args.commands.clone();
    if let Some(path) = &args.jobs_file {
        let contents = tokio::fs::read_to_string(path).await?;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            commands.push(line.to_string());
        }
    }
    if commands.is_empty() {
        return Err("no commands given (pass them as arguments or via --jobs-file)".into());
    }

    let config = SchedulerConfig::new(args.workers)
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_max_tracked_jobs(args.max_tracked);
    let shutdown = install_shutdown_handler();
    let mut scheduler = JobScheduler::new(config).with_shutdown(shutdown);

    scheduler.add_jobs(
        commands
            .iter()
            .map(|command| Task::command("sh", ["-c", command.as_str()])),
    );

    let report = scheduler.run_all().await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_report_table(&report),
    }

    if report.interrupted || report.counts.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report_table(report: &RunReport) {
    println!(
        "{} started, {} finished, {} failed in {:.2?}{}",
        report.started,
        report.counts.finished,
        report.counts.failed,
        report.elapsed,
        if report.interrupted {
            " (interrupted)"
        } else {
            ""
        }
    );
    if !report.failures.is_empty() {
        println!();
        println!("{:<38} {:<24} FAILURE", "JOB ID", "COMMAND");
        for failure in &report.failures {
            println!(
                "{:<38} {:<24} {}",
                failure.job_id, failure.label, failure.kind
            );
        }
    }
}
