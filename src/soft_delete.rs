//! Soft-deleted key vaults
//!
//! A deleted vault lingers under its location until it is purged or its
//! retention runs out, and its name can't be reused in the meantime. Callers
//! check for one before creating a vault and may purge it after a delete.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ids::{DeletedVaultId, KeyVaultId, ResourceId};
use crate::operation::{OperationResult, Poller};
use crate::transport::{Request, Transport};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletedVaultProperties {
    #[serde(default)]
    vault_id: Option<String>,
    #[serde(default)]
    deletion_date: Option<String>,
    #[serde(default)]
    scheduled_purge_date: Option<String>,
    #[serde(default)]
    purge_protection_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DeletedVaultBody {
    #[serde(default)]
    properties: DeletedVaultProperties,
}

/// A vault waiting out its retention period
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedVault {
    pub id: DeletedVaultId,
    /// Identifier of the vault before it was deleted
    pub vault_id: Option<String>,
    pub deletion_date: Option<DateTime<Utc>>,
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    pub purge_protection_enabled: bool,
}

fn parse_date(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!("ignoring unparseable date {:?}: {}", raw, e);
            None
        },
    }
}

pub struct SoftDeletedVaults {
    poller: Poller,
}

impl SoftDeletedVaults {
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            poller: Poller::new(transport, config.poll.clone()),
        }
    }

    /// The soft-deleted vault that would block creating `vault` in `location`.
    ///
    /// Not found and forbidden both mean there is nothing to recover.
    pub async fn find(&self, vault: &KeyVaultId, location: &str) -> Result<Option<DeletedVault>> {
        let id = vault.deleted(location);
        let response = self.poller.send_with_retry(&Request::get(id.id())).await?;
        if !response.is_success() {
            let err = Error::from_response(&response);
            if err.is_skippable() {
                return Ok(None);
            }
            return Err(err);
        }

        let body: DeletedVaultBody = response.json()?;
        let props = body.properties;
        tracing::debug!("found soft-deleted vault {}", id.describe());
        Ok(Some(DeletedVault {
            id,
            vault_id: props.vault_id,
            deletion_date: parse_date(props.deletion_date),
            scheduled_purge_date: parse_date(props.scheduled_purge_date),
            purge_protection_enabled: props.purge_protection_enabled.unwrap_or(false),
        }))
    }

    /// Permanently remove a soft-deleted vault and wait for the purge to finish
    pub async fn purge(&self, id: &DeletedVaultId, cancel: &CancellationToken) -> Result<OperationResult> {
        tracing::info!("purging {}", id.describe());
        self.poller
            .submit_and_poll(Request::post(format!("{}/purge", id.id())), cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{accepted_with_location, json_response, ScriptedTransport};
    use chrono::TimeZone;
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    const DELETED: &str = "/subscriptions/s1/providers/Microsoft.KeyVault/locations/westeurope/deletedVaults/kv1";

    fn vaults(transport: &Arc<ScriptedTransport>) -> SoftDeletedVaults {
        SoftDeletedVaults::new(transport.clone(), &Config::default())
    }

    #[tokio::test]
    async fn test_find_reads_retention_dates() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json_response(
            200,
            json!({
                "id": DELETED,
                "name": "kv1",
                "type": "Microsoft.KeyVault/deletedVaults",
                "properties": {
                    "vaultId": "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv1",
                    "location": "westeurope",
                    "deletionDate": "2026-01-02T03:04:05Z",
                    "scheduledPurgeDate": "2026-04-02T03:04:05Z",
                    "purgeProtectionEnabled": true
                }
            }),
        ))]));

        let found = vaults(&transport)
            .find(&KeyVaultId::new("s1", "rg1", "kv1"), "westeurope")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id.deleted_vault_name(), "kv1");
        assert_eq!(found.deletion_date, Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()));
        assert!(found.scheduled_purge_date.is_some());
        assert!(found.purge_protection_enabled);
        assert_eq!(transport.requests()[0].0.path, DELETED);
    }

    #[tokio::test]
    async fn test_find_treats_not_found_and_forbidden_as_absent() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json_response(404, json!({ "error": { "code": "NotFound", "message": "" } }))),
            Ok(json_response(403, json!(null))),
            Ok(json_response(409, json!({ "error": { "code": "Conflict", "message": "busy" } }))),
        ]));
        let vaults = vaults(&transport);
        let id = KeyVaultId::new("s1", "rg1", "kv1");

        assert_eq!(vaults.find(&id, "westeurope").await.unwrap(), None);
        assert_eq!(vaults.find(&id, "westeurope").await.unwrap(), None);
        assert!(matches!(
            vaults.find(&id, "westeurope").await,
            Err(Error::Rejected { status: 409, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_polls_until_done() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(accepted_with_location("https://poll.test/purge1", None)),
            Ok(accepted_with_location("https://poll.test/purge1", None)),
            Ok(json_response(200, json!(null))),
        ]));
        let id = KeyVaultId::new("s1", "rg1", "kv1").deleted("westeurope");

        let result = vaults(&transport)
            .purge(&id, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, StatusCode::OK);
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].0.method, Method::POST);
        assert_eq!(requests[0].0.path, format!("{DELETED}/purge"));
        assert_eq!(requests[1].0.path, "https://poll.test/purge1");
    }
}
