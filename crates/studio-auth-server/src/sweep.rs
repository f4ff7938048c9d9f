//! Periodic removal of expired authorization codes and browser sessions.

use std::sync::Arc;
use std::time::Duration;

use studio_auth::{AuthResult, OAuthService, SessionStore};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Counts of rows removed by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub codes: u64,
    pub sessions: u64,
}

/// Runs one sweep at `now`.
pub async fn sweep_once(
    service: &OAuthService,
    sessions: &dyn SessionStore,
    now: OffsetDateTime,
) -> AuthResult<SweepReport> {
    let codes = service.sweep_expired_codes(now).await?;
    let sessions = sessions.delete_expired(now).await?;
    Ok(SweepReport { codes, sessions })
}

/// Spawns the background sweeper. Abort the handle to stop it.
pub fn spawn_sweeper(
    service: OAuthService,
    sessions: Arc<dyn SessionStore>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sweep_once(&service, sessions.as_ref(), OffsetDateTime::now_utc()).await {
                Ok(report) if report.codes > 0 || report.sessions > 0 => {
                    tracing::debug!(
                        codes = report.codes,
                        sessions = report.sessions,
                        "Swept expired entries"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Expired entry sweep failed"),
            }
        }
    })
}
