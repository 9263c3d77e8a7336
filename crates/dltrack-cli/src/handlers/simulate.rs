//! Simulate command handler.
//!
//! Submits one download to the simulated engine and prints every event
//! until the download is terminal or the stop timer fires.

use std::time::Duration;

use anyhow::Result;

use dltrack_core::download::{
    DownloadEvent, DownloadId, FailureReason, NetworkPolicy, StatusReport,
};
use dltrack_core::ports::{DownloadSubmission, DownloadTrackerPort, StopOutcome};
use dltrack_download::SimulationConfig;

use crate::bootstrap::CliContext;
use crate::commands::SimulateArgs;
use crate::error::CliError;

/// What a simulation run observed.
#[derive(Debug, Default)]
pub struct SimulationReport {
    /// Events in delivery order.
    pub events: Vec<DownloadEvent>,
    /// Status queried after the terminal event.
    pub final_status: Option<StatusReport>,
    /// Result of the final `stop`.
    pub stopped: Option<StopOutcome>,
}

/// Engine shape requested on the command line.
pub fn simulation_config(args: &SimulateArgs) -> SimulationConfig {
    let config = SimulationConfig::default()
        .with_total_bytes(args.size)
        .with_rate(args.rate)
        .with_start_delay(Duration::from_millis(args.start_delay_ms));

    match args.fail.as_deref() {
        Some(code) => config.with_failure(code.parse().unwrap_or(FailureReason::Unknown)),
        None => config,
    }
}

/// Build the submission from command-line arguments.
pub fn build_submission(args: &SimulateArgs) -> Result<DownloadSubmission, CliError> {
    let network = if args.wifi_only {
        NetworkPolicy::WifiOnly
    } else {
        NetworkPolicy::AnyNetwork
    };

    let mut submission =
        DownloadSubmission::new(args.id.as_str(), args.url.as_str(), args.destination.as_str())
            .with_network(network);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        submission = submission.with_header(name, value);
    }
    Ok(submission)
}

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(&str, &str), CliError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| CliError::Arguments(format!("header '{raw}' is not 'Name: value'")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::Arguments(format!("header '{raw}' has no name")));
    }
    Ok((name, value.trim()))
}

/// Execute the simulate command.
pub async fn execute(ctx: &CliContext, args: &SimulateArgs) -> Result<()> {
    let report = run(ctx, args).await?;

    if let Some(status) = &report.final_status {
        println!("status: {}", serde_json::to_string(status)?);
    }
    if let Some(stopped) = report.stopped {
        println!("stopped: removed={}", stopped.removed);
    }
    Ok(())
}

/// Drive one simulated download to its end.
pub async fn run(ctx: &CliContext, args: &SimulateArgs) -> Result<SimulationReport> {
    let submission = build_submission(args)?;
    let id = submission.id.clone();

    let mut events = ctx.events.subscribe();
    let ack = ctx
        .tracker
        .download(submission)
        .await
        .map_err(CliError::from)?;
    println!("accepted: {} ({})", ack.id, ack.status);

    let mut report = SimulationReport::default();
    let stop_after = args.stop_after_ms.map(Duration::from_millis);
    let stop_timer = async {
        match stop_after {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop_timer);

    loop {
        tokio::select! {
            () = &mut stop_timer => {
                report.stopped = Some(stop(ctx, &id).await?);
                return Ok(report);
            }
            received = events.recv() => match received {
                Some(event) if event.id() == &id => {
                    print_event(&event, args.json)?;
                    let terminal = event.is_terminal();
                    report.events.push(event);
                    if terminal {
                        break;
                    }
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    report.final_status = Some(
        ctx.tracker
            .check_status(&id)
            .await
            .map_err(CliError::from)?,
    );
    report.stopped = Some(stop(ctx, &id).await?);
    Ok(report)
}

async fn stop(ctx: &CliContext, id: &DownloadId) -> Result<StopOutcome, CliError> {
    Ok(ctx.tracker.stop(id).await?)
}

fn print_event(event: &DownloadEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        DownloadEvent::DownloadProgress { id, progress } => {
            println!("{}: {id} {:.1}%", event.event_name(), progress * 100.0);
        }
        DownloadEvent::DownloadCompleted { id } => {
            println!("{}: {id}", event.event_name());
        }
        DownloadEvent::DownloadFailed { id, error, .. } => {
            println!("{}: {id} {error}", event.event_name());
        }
    }
    Ok(())
}
