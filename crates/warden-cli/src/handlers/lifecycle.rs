//! Start, stop, restart and status of the managed process.

use warden_core::{StartReport, StopOutcome};
use warden_runtime::text::format_duration;

use super::{Reply, describe_error};
use crate::bootstrap::AppContext;

fn started(report: &StartReport) -> String {
    let mut text = format!("Managed process started (PID {})", report.launcher_pid);
    if report.alternate_route {
        text.push_str(" via proxy");
    }
    if report.tailing {
        text.push_str("\nStreaming output to debug chats");
    }
    text
}

fn stopped(outcome: &StopOutcome) -> String {
    match outcome {
        StopOutcome::WasNotRunning => "Managed process was not running".to_string(),
        StopOutcome::Stopped { mode, processes } => {
            format!(
                "Managed process stopped ({mode}, {} process(es))",
                processes.len()
            )
        }
    }
}

pub async fn start(ctx: &AppContext, alternate_route: bool) -> Reply {
    match ctx.controller.start(alternate_route).await {
        Ok(report) => Reply::text(started(&report)),
        Err(e) => Reply::text(describe_error(&e)),
    }
}

pub async fn stop(ctx: &AppContext) -> Reply {
    let timeout = ctx.controller.settings().stop_timeout;
    match ctx.controller.stop(timeout).await {
        Ok(outcome) => Reply::text(stopped(&outcome)),
        Err(e) => Reply::text(describe_error(&e)),
    }
}

pub async fn restart(ctx: &AppContext, alternate_route: bool) -> Reply {
    let timeout = ctx.controller.settings().restart_stop_timeout;
    match ctx.controller.restart(timeout, alternate_route).await {
        Ok(report) => {
            let start = match &report.start {
                Ok(start) => started(start),
                Err(e) => describe_error(e),
            };
            Reply::text(format!("{}\n{start}", stopped(&report.stop)))
        }
        Err(e) => Reply::text(describe_error(&e)),
    }
}

pub fn status(ctx: &AppContext) -> Reply {
    let status = ctx.controller.status();
    let text = match (status.running, status.uptime()) {
        (true, Some(uptime)) => format!(
            "Managed process is running\nUptime: {}",
            format_duration(uptime)
        ),
        (true, None) => "Managed process is running".to_string(),
        (false, _) => "Managed process is stopped".to_string(),
    };
    Reply::Text(text)
}

pub fn uptime(ctx: &AppContext) -> Reply {
    let status = ctx.controller.status();
    match status.uptime() {
        Some(uptime) if status.running => {
            Reply::Text(format!("Managed process: {}", format_duration(uptime)))
        }
        _ => Reply::text("Managed process is not running"),
    }
}
