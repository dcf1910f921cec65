//! Startup announcement to the owner and authorized users.

use tracing::{info, warn};
use warden_core::{ChatId, ChatSenderPort};
use warden_runtime::{AccessList, FlushReport};

/// Greeting sent to every authorized user once the channel is up.
pub fn greeting(bot_name: &str) -> String {
    format!("{bot_name} is up\n\nSend /help for the command list")
}

/// Tell the owner and every authorized user that the supervisor is up.
///
/// A failed delivery to one user does not stop delivery to the rest.
pub async fn notify_startup(
    sender: &dyn ChatSenderPort,
    access: &AccessList,
    bot_name: &str,
) -> FlushReport {
    let text = greeting(bot_name);
    let mut report = FlushReport::default();
    for user in access.everyone() {
        match sender.send_text(ChatId::from(user), &text).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!(%user, error = %e, "Failed to send startup notice");
                report.failed += 1;
            }
        }
    }
    info!(
        delivered = report.delivered,
        failed = report.failed,
        "Startup notice sent"
    );
    report
}
