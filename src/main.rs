// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use skein::config::loader::load_run_config;
use skein::engine::factory::SchedulerKind;
use skein::graph::GraphSource;
use skein::runner::{CacheSettings, RunError, RunOptions, Runner};
use skein::values::Value;

const INTERRUPT_EXIT_CODE: u8 = 130;

fn usage(program: &str) {
    eprintln!("Usage: {program} <run-config.yaml> [--verbose] [--dry-run]");
    eprintln!();
    eprintln!("The run configuration names the graph, scheduler and worker count;");
    eprintln!("see the config loader documentation for the full shape.");
}

/// Exit codes: 1 for configuration/validation problems, 2 for unit
/// failures surfacing out of a run.
fn exit_code_for(error: &RunError) -> u8 {
    match error {
        RunError::Graph(_) | RunError::Scheduler(_) | RunError::Config(_) => 1,
        RunError::Execution(_) => 2,
    }
}

async fn run(config_path: &Path, verbose: bool, dry_run: bool) -> Result<(), RunError> {
    let run_config = load_run_config(config_path)?;

    let mut options = RunOptions::new(GraphSource::Path(run_config.graph.clone()));
    options.graph_params = run_config.graph_params;
    options.scheduler = SchedulerKind::from_str(&run_config.scheduler)?;
    options.num_workers = run_config.num_workers;
    options.dry_run = run_config.dry_run || dry_run;
    options.verbose = run_config.verbose || verbose;
    options.profiler_path = run_config.profiler_path;
    options.common_params = run_config.common_params;
    options.config_path = run_config.config_path;
    options.cache = run_config.cache.map(|section| CacheSettings {
        enabled: section.enabled,
        dir: section.dir,
    });

    let runner = Runner::new();
    let results = runner.run(options).await?;

    println!("completed {} task(s)", results.len());
    let mut terminal: Vec<_> = results.iter().collect();
    terminal.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (task_id, value) in terminal {
        if !matches!(value, Value::None) {
            println!("  {task_id}: {value}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args
        .first()
        .map(String::as_str)
        .unwrap_or("skein")
        .to_string();

    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;
    let mut dry_run = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "--verbose" => verbose = true,
            "--dry-run" => dry_run = true,
            "--help" | "-h" => {
                usage(&program);
                return ExitCode::SUCCESS;
            }
            other if config_path.is_none() => config_path = Some(PathBuf::from(other)),
            other => {
                eprintln!("unexpected argument '{other}'");
                usage(&program);
                return ExitCode::from(1);
            }
        }
    }
    let Some(config_path) = config_path else {
        usage(&program);
        return ExitCode::from(1);
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            ExitCode::from(INTERRUPT_EXIT_CODE)
        }
        result = run(&config_path, verbose, dry_run) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error}");
                let mut source = std::error::Error::source(&error);
                while let Some(cause) = source {
                    eprintln!("  caused by: {cause}");
                    source = cause.source();
                }
                ExitCode::from(exit_code_for(&error))
            }
        }
    }
}
