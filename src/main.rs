use tokio::io::{AsyncBufReadExt, BufReader};

mod activity_log;
mod ai;
mod app;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod orchestrator;
mod scheduler;
mod services;
#[cfg(test)]
mod test_utils;

use app::{App, Reply};
use cli::{parse_command, render_report, render_status};
use config::Config;
use error::Result;
use models::ReportKind;
use orchestrator::RunOutcome;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Initialize app
    let mut app = App::new(&config).await?;

    // --generate <kind>: run once, print the result and exit
    if args.len() >= 3 && args[1] == "--generate" {
        let kind = parse_kind(&args[2])?;
        match app.orchestrator().run(kind, true).await {
            RunOutcome::Completed(report) | RunOutcome::Failed(report) => {
                print!("{}", render_report(&report));
            }
            RunOutcome::Skipped => println!("A report is already being generated."),
        }
        return Ok(());
    }

    // --show <kind>: print today's saved report and exit
    if args.len() >= 3 && args[1] == "--show" {
        let kind = parse_kind(&args[2])?;
        match app.show_saved(kind).await? {
            Some(report) => print!("{}", render_report(&report)),
            None => println!("No {} report saved for today.", kind.label().to_lowercase()),
        }
        return Ok(());
    }

    app.start_scheduler(config.tick_interval());

    print!("{}", render_status(&app.schedule()));
    if let Some(report) = app.current_report().await {
        print!("{}", render_report(&report));
    }
    println!("Type 'help' for commands. Automatic reports only run while this process is running.");

    let result = run_app(&mut app).await;
    app.shutdown();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

fn parse_kind(arg: &str) -> Result<ReportKind> {
    arg.parse::<ReportKind>()
        .map_err(|e| anyhow::anyhow!("{e} (expected morning or evening)").into())
}

async fn run_app(app: &mut App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };

        // stdin closed: keep the scheduler running until interrupted
        let Some(line) = line else {
            tokio::signal::ctrl_c().await?;
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(action) = parse_command(&line) else {
            println!("Unknown command: {}. Type 'help' for commands.", line.trim());
            continue;
        };

        match app.handle_action(action).await? {
            Reply::Quit => return Ok(()),
            Reply::Text(text) => print!("{}", text),
        }
    }
}
