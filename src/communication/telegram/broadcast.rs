use crate::communication::notifier::Notifier;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends the same message to every user, at most `concurrency` at a time.
/// Blocked bots and deleted accounts only count as failures.
pub async fn broadcast(
    notifier: &dyn Notifier,
    user_ids: &[i64],
    html: &str,
    concurrency: usize,
) -> BroadcastReport {
    let results: Vec<bool> = stream::iter(user_ids.iter().copied())
        .map(|user_id| async move {
            match notifier.notify(user_id, html).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(%user_id, error = %e, "Broadcast delivery failed");
                    false
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let sent = results.iter().filter(|ok| **ok).count();
    let report = BroadcastReport {
        sent,
        failed: results.len() - sent,
    };
    info!(sent = report.sent, failed = report.failed, "Broadcast finished");
    report
}
