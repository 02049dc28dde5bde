use std::sync::Arc;
use std::time::Duration;

use syncbot_github::GithubClientProvider;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Refreshes the GitHub credential every `period` until shutdown. A failed
/// refresh keeps the current client and waits for the next tick.
pub async fn run_credential_refresh(
    provider: Arc<GithubClientProvider>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("credential refresh stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Err(error) = provider.refresh().await {
                    warn!(
                        mode = provider.source().mode(),
                        error = %format!("{error:#}"),
                        "github credential refresh failed; keeping previous credential"
                    );
                }
            }
        }
    }
}
