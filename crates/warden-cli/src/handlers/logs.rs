//! Log export and debug streaming toggles.

use warden_core::ChatId;
use warden_runtime::export_logs;

use super::{Reply, describe_error};
use crate::bootstrap::AppContext;

pub async fn export(ctx: &AppContext, level: &str) -> Reply {
    let log_file = &ctx.controller.target().log_file;
    match export_logs(log_file, level).await {
        Ok(export) => Reply::Document {
            caption: format!("Logs: {}", export.level),
            file_name: export.file_name,
            content: export.content,
        },
        Err(e) => Reply::text(describe_error(&e)),
    }
}

pub fn debug_on(ctx: &AppContext, chat: ChatId) -> Reply {
    if !ctx.controller.subscribe_debug(chat) {
        return Reply::text("Debug mode is already on in this chat");
    }
    if ctx.controller.tailer_active() {
        Reply::text("Debug mode on. Process output will be streamed here.")
    } else {
        Reply::text("Debug mode on. Output will be streamed once the process runs.")
    }
}

pub fn debug_off(ctx: &AppContext, chat: ChatId) -> Reply {
    if ctx.controller.unsubscribe_debug(chat) {
        Reply::text("Debug mode off")
    } else {
        Reply::text("Debug mode was not on in this chat")
    }
}
