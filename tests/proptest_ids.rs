//! Property-based tests using proptest
//!
//! These tests verify identifier parsing and rendering across every
//! identifier type, and the state machine of the operation poller, using
//! randomized inputs.

use arm_core::ids::{
    DeletedVaultId, KeyVaultId, ParseErrorKind, ResourceGroupId, ResourceId, StorageAccountId, SubnetId,
    SubscriptionId, VirtualNetworkId, WidgetId,
};
use proptest::prelude::*;

/// Generate a user-specified segment value
fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._-]{0,23}"
}

/// Generate a subscription id, usually UUID shaped
fn arb_subscription() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        1 => "[a-z0-9]{1,12}",
    ]
}

/// Render, then strict parse, must give back an equal identifier
fn assert_round_trip<T: ResourceId>(id: &T) -> Result<(), TestCaseError> {
    let rendered = id.to_string();
    let parsed = T::parse(&rendered).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert_eq!(&parsed, id);
    prop_assert_eq!(parsed.to_string(), rendered);
    Ok(())
}

proptest! {
    #[test]
    fn subscription_round_trips(s in arb_subscription()) {
        assert_round_trip(&SubscriptionId::new(s))?;
    }

    #[test]
    fn resource_group_round_trips(s in arb_subscription(), rg in arb_name()) {
        assert_round_trip(&ResourceGroupId::new(s, rg))?;
    }

    #[test]
    fn key_vault_round_trips(s in arb_subscription(), rg in arb_name(), name in arb_name()) {
        assert_round_trip(&KeyVaultId::new(s, rg, name))?;
    }

    #[test]
    fn deleted_vault_round_trips(s in arb_subscription(), location in arb_name(), name in arb_name()) {
        assert_round_trip(&DeletedVaultId::new(s, location, name))?;
    }

    #[test]
    fn virtual_network_round_trips(s in arb_subscription(), rg in arb_name(), vnet in arb_name()) {
        assert_round_trip(&VirtualNetworkId::new(s, rg, vnet))?;
    }

    #[test]
    fn subnet_round_trips(
        s in arb_subscription(),
        rg in arb_name(),
        vnet in arb_name(),
        subnet in arb_name()
    ) {
        assert_round_trip(&SubnetId::new(s, rg, vnet, subnet))?;
    }

    #[test]
    fn storage_account_round_trips(s in arb_subscription(), rg in arb_name(), name in arb_name()) {
        assert_round_trip(&StorageAccountId::new(s, rg, name))?;
    }

    #[test]
    fn widget_round_trips(s in arb_subscription(), rg in arb_name(), name in arb_name()) {
        assert_round_trip(&WidgetId::new(s, rg, name))?;
    }

    #[test]
    fn serde_round_trips(s in arb_subscription(), rg in arb_name(), name in arb_name()) {
        let id = KeyVaultId::new(s, rg, name);
        let json = serde_json::to_string(&id).unwrap();
        let back: KeyVaultId = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, id);
    }
}

/// Tests for malformed input
mod malformed_input_tests {
    use super::*;

    proptest! {
        #[test]
        fn wrong_segment_count_is_always_a_count_mismatch(
            parts in prop::collection::vec("[a-zA-Z0-9.]{0,10}", 0..16),
            leading_slash in any::<bool>()
        ) {
            prop_assume!(parts.len() != KeyVaultId::segments().len());
            let body = parts.join("/");
            let input = if leading_slash { format!("/{body}") } else { body };

            let err = KeyVaultId::parse(&input).unwrap_err();
            let is_count_mismatch = matches!(
                err.kind,
                ParseErrorKind::SegmentCountMismatch { expected: 8, .. }
            );
            prop_assert!(is_count_mismatch, "unexpected error {}", err);
        }

        #[test]
        fn extra_segment_is_a_count_mismatch(
            s in arb_subscription(),
            rg in arb_name(),
            name in arb_name(),
            extra in arb_name()
        ) {
            let input = format!("{}/{}", WidgetId::new(s, rg, name), extra);
            let err = WidgetId::parse(&input).unwrap_err();
            let is_count_mismatch = matches!(err.kind, ParseErrorKind::SegmentCountMismatch { .. });
            prop_assert!(is_count_mismatch);
        }

        #[test]
        fn upper_cased_literals_need_lenient_parsing(
            s in arb_subscription(),
            rg in arb_name(),
            name in arb_name()
        ) {
            let id = KeyVaultId::new(s, rg, name.clone());
            let shouted = id
                .to_string()
                .replace("subscriptions", "SUBSCRIPTIONS")
                .replace("resourceGroups", "RESOURCEGROUPS")
                .replace("Microsoft.KeyVault", "MICROSOFT.KEYVAULT");

            prop_assert!(KeyVaultId::parse(&shouted).is_err());
            let lenient = KeyVaultId::parse_insensitively(&shouted).unwrap();
            prop_assert_eq!(lenient.vault_name(), name.as_str());
            prop_assert_eq!(lenient, id);
        }
    }
}

/// Tests for the operation poller state machine
mod poller_tests {
    use super::*;
    use arm_core::config::PollConfig;
    use arm_core::operation::{AsyncOperation, OperationState, PollLocator, Poller};
    use arm_core::transport::{Request, Response, Transport, TransportError};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Running,
        Throttled,
        Succeeded,
        Failed,
    }

    fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
        prop::collection::vec(
            prop_oneof![
                4 => Just(Step::Running),
                1 => Just(Step::Throttled),
                1 => Just(Step::Succeeded),
                1 => Just(Step::Failed),
            ],
            1..20,
        )
    }

    struct Script(Mutex<VecDeque<Step>>);

    #[async_trait]
    impl Transport for Script {
        async fn send(&self, _request: Request) -> Result<Response, TransportError> {
            // once the script runs out the operation stays running
            let step = self.0.lock().unwrap().pop_front().unwrap_or(Step::Running);
            let response = match step {
                Step::Running => Response::new(StatusCode::ACCEPTED),
                Step::Throttled => Response::new(StatusCode::TOO_MANY_REQUESTS),
                Step::Succeeded => Response::new(StatusCode::OK),
                Step::Failed => Response::new(StatusCode::BAD_REQUEST),
            };
            Ok(response)
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn state_only_moves_forward(steps in arb_steps()) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let transport = Arc::new(Script(Mutex::new(steps.into())));
            let poller = Poller::new(
                transport,
                PollConfig {
                    initial_interval: Duration::from_secs(1),
                    max_interval: Duration::from_secs(8),
                    multiplier: 2.0,
                    max_transient_retries: 3,
                    timeout: Duration::from_secs(120),
                },
            );
            let mut op = AsyncOperation::new(
                Request::delete("/subscriptions/s/resourceGroups/rg"),
                PollLocator::Location("https://poll.test/op".to_string()),
            );

            let result = runtime.block_on(poller.poll_until_done(&mut op, &CancellationToken::new()));

            let history = op.history();
            prop_assert_eq!(history[0], OperationState::Pending);
            for pair in history.windows(2) {
                prop_assert!(pair[0].rank() < pair[1].rank(), "history went backwards: {:?}", history);
            }
            prop_assert!(op.state().is_terminal());
            prop_assert_eq!(result.is_ok(), op.state() == OperationState::Succeeded);

            // a terminal operation is never polled again
            let polls = op.polls();
            let again = runtime.block_on(poller.poll_until_done(&mut op, &CancellationToken::new()));
            prop_assert_eq!(again.is_ok(), result.is_ok());
            prop_assert_eq!(op.polls(), polls);
        }
    }
}
