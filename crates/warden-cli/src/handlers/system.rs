//! Host metrics, diagnostics, terminal commands and maintenance.

use warden_runtime::text::format_duration;
use warden_runtime::{
    CommandOutput, TerminalCommand, collect_host_snapshot, diagnose as run_diagnostics,
    system_uptime,
};

use super::{Reply, describe_error};
use crate::bootstrap::AppContext;

pub fn uptime() -> Reply {
    Reply::Text(format!("System: {}", format_duration(system_uptime())))
}

pub async fn info() -> Reply {
    Reply::Text(collect_host_snapshot().await.to_string())
}

pub async fn ram() -> Reply {
    Reply::Text(collect_host_snapshot().await.memory_line())
}

pub async fn cpu() -> Reply {
    Reply::Text(collect_host_snapshot().await.cpu_line())
}

pub async fn disk() -> Reply {
    Reply::Text(collect_host_snapshot().await.disk_line())
}

pub async fn ping(ctx: &AppContext, host: Option<&str>) -> Reply {
    match ctx.terminal.ping(host.unwrap_or_default()).await {
        Ok(report) => Reply::Text(report.to_string()),
        Err(e) => Reply::text(describe_error(&e)),
    }
}

pub async fn diagnose(ctx: &AppContext) -> Reply {
    Reply::Text(run_diagnostics(&ctx.controller).await.to_string())
}

pub async fn terminal(ctx: &AppContext, command: TerminalCommand) -> Reply {
    match ctx.terminal.run(command).await {
        Ok(output) => Reply::Text(render_output(&format!("$ {command}"), &output)),
        Err(e) => Reply::text(describe_error(&e)),
    }
}

pub async fn install_requirements(ctx: &AppContext) -> Reply {
    match ctx.terminal.install_requirements().await {
        Ok(output) => Reply::Text(render_output("Install requirements", &output)),
        Err(e) => Reply::text(describe_error(&e)),
    }
}

pub async fn update(ctx: &AppContext) -> Reply {
    match ctx.terminal.update_package().await {
        Ok(output) => Reply::Text(render_output("Update", &output)),
        Err(e) => Reply::text(describe_error(&e)),
    }
}

fn render_output(title: &str, output: &CommandOutput) -> String {
    let outcome = match (output.success, output.exit_code) {
        (true, _) => "done".to_string(),
        (false, Some(code)) => format!("failed with exit code {code}"),
        (false, None) => "failed".to_string(),
    };
    format!("{title}: {outcome}\n{}", output.text)
}
