//! Waiting for a new data-plane endpoint to become reachable
//!
//! A freshly provisioned endpoint can take a while to resolve in DNS even
//! after the control plane reports success. The endpoint counts as available
//! once it has answered a run of consecutive probes. Any HTTP answer counts,
//! including 401 since probes are unauthenticated; a failure to connect
//! resets the run.
//!
//! Send probes through a [`crate::transport::ProbeTransport`], never the
//! management transport.

use crate::config::AvailabilityConfig;
use crate::error::{Error, Result};
use crate::transport::{Request, Transport};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub async fn wait_until_available(
    transport: &dyn Transport,
    endpoint: &str,
    config: &AvailabilityConfig,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<()> {
    let started = Instant::now();
    let required = config.required_successes.max(1);
    let mut streak = 0u32;
    let mut wake = started + config.delay;

    tracing::info!("waiting for {} to answer {} consecutive probes", endpoint, required);

    loop {
        if wake >= deadline {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Canceled),
                _ = tokio::time::sleep_until(deadline) => {},
            }
            return Err(Error::Timeout {
                waited: Instant::now() - started,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            _ = tokio::time::sleep_until(wake) => {},
        }

        match transport.send(Request::get(endpoint)).await {
            Ok(response) => {
                streak += 1;
                tracing::debug!("{} answered {} ({}/{})", endpoint, response.status, streak, required);
                if streak >= required {
                    return Ok(());
                }
            },
            Err(e) => {
                if streak > 0 {
                    tracing::debug!("{} stopped answering after {} probe(s): {}", endpoint, streak, e);
                }
                streak = 0;
            },
        }

        wake = Instant::now() + config.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{json_response, ScriptedTransport};
    use crate::transport::TransportError;
    use serde_json::json;
    use std::time::Duration;

    fn config() -> AvailabilityConfig {
        AvailabilityConfig {
            enabled: true,
            delay: Duration::from_secs(30),
            interval: Duration::from_secs(10),
            required_successes: 3,
        }
    }

    fn refused() -> std::result::Result<crate::transport::Response, TransportError> {
        Err(TransportError::InvalidUrl {
            url: "https://kv1.vault.azure.net/".to_string(),
            reason: "no such host".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_streak_resets_on_failure() {
        let transport = ScriptedTransport::new(vec![
            Ok(json_response(401, json!(null))),
            refused(),
            Ok(json_response(401, json!(null))),
            Ok(json_response(200, json!(null))),
            Ok(json_response(401, json!(null))),
        ]);
        let started = Instant::now();

        wait_until_available(
            &transport,
            "https://kv1.vault.azure.net/",
            &config(),
            started + Duration::from_secs(600),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[0].1 - started, Duration::from_secs(30));
        assert_eq!(requests[4].1 - started, Duration::from_secs(70));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_before_streak_completes() {
        let transport = ScriptedTransport::new(vec![refused(), refused(), refused()]);
        let started = Instant::now();

        let err = wait_until_available(
            &transport,
            "https://kv1.vault.azure.net/",
            &config(),
            started + Duration::from_secs(55),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        // probes at 30s and 40s and 50s; the next one would land past the deadline
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_during_initial_delay() {
        let transport = ScriptedTransport::new(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = wait_until_available(
            &transport,
            "https://kv1.vault.azure.net/",
            &config(),
            Instant::now() + Duration::from_secs(600),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Canceled));
        assert!(transport.requests().is_empty());
    }
}
