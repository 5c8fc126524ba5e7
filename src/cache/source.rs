//! Where cached endpoints come from

use super::ListScope;
use crate::error::{Error, Result};
use crate::ids::{ResourceId, ScopedResource};
use crate::payload::ResourcePayload;
use crate::transport::{Request, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

/// An identifier from a listing, with its endpoint when the listing carries one
#[derive(Debug, Clone, PartialEq)]
pub struct Listed<I> {
    pub id: I,
    pub endpoint: Option<String>,
}

/// Listing and point lookups for one resource type
#[async_trait]
pub trait EndpointSource<I: ScopedResource>: Send + Sync {
    /// Listing that includes endpoints
    async fn list_primary(&self, scope: &ListScope) -> Result<Vec<Listed<I>>>;

    /// Listing of identifiers only, used to catch resources the primary listing missed
    async fn list_secondary(&self, scope: &ListScope) -> Result<Vec<I>>;

    /// Endpoint of a single resource
    async fn get(&self, id: &I) -> Result<String>;
}

/// Result of paginated fetch
struct Page {
    items: Vec<Value>,
    next_link: Option<String>,
}

/// [`EndpointSource`] backed by the management API.
///
/// The primary listing is the provider listing
/// (`{scope}/providers/{resource type}`), the secondary listing is the
/// generic resource listing filtered by type, and point lookups read the
/// resource itself.
pub struct ArmEndpointSource<I> {
    transport: Arc<dyn Transport>,
    endpoint_pointer: Option<String>,
    _marker: PhantomData<fn() -> I>,
}

impl<I: ScopedResource> ArmEndpointSource<I> {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            endpoint_pointer: None,
            _marker: PhantomData,
        }
    }

    /// JSON pointer to the endpoint for resource shapes without a typed payload,
    /// e.g. `/properties/endpoint`
    pub fn with_endpoint_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.endpoint_pointer = Some(pointer.into());
        self
    }

    fn endpoint_of(&self, item: Value) -> Result<Option<String>> {
        let payload = ResourcePayload::from_value(item)?;
        Ok(payload.endpoint_or(self.endpoint_pointer.as_deref()))
    }

    /// Fetch all pages (following `nextLink`)
    ///
    /// Stops early if the server hands out a link it already gave.
    async fn fetch_all(&self, first: Request) -> Result<Vec<Value>> {
        let mut all_items = Vec::new();
        let mut followed = HashSet::new();
        let mut request = first;

        loop {
            let page = self.fetch_page(request).await?;
            all_items.extend(page.items);

            let Some(next_link) = page.next_link else {
                break;
            };
            if !followed.insert(next_link.clone()) {
                tracing::warn!("listing repeated nextLink {}, stopping", next_link);
                break;
            }
            request = Request::get(next_link);
        }

        Ok(all_items)
    }

    async fn fetch_page(&self, request: Request) -> Result<Page> {
        tracing::debug!("listing {}", request.path);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| Error::TransientTransport { attempts: 1, source })?;
        if !response.is_success() {
            return Err(Error::from_response(&response));
        }

        let body: Value = response.json()?;
        let items = body
            .get("value")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let next_link = body
            .get("nextLink")
            .and_then(|v| v.as_str())
            .filter(|link| !link.is_empty())
            .map(|link| link.to_string());

        Ok(Page { items, next_link })
    }
}

/// Identifier of a listed item; items that don't parse as `I` are dropped
fn listed_id<I: ResourceId>(item: &Value) -> Option<I> {
    let raw = item.get("id").and_then(|v| v.as_str())?;
    match I::parse_insensitively(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("ignoring listed item: {}", e);
            None
        },
    }
}

#[async_trait]
impl<I: ScopedResource> EndpointSource<I> for ArmEndpointSource<I> {
    async fn list_primary(&self, scope: &ListScope) -> Result<Vec<Listed<I>>> {
        let path = format!("{}/providers/{}", scope.path(), I::RESOURCE_TYPE);
        let items = self.fetch_all(Request::get(path)).await?;

        let mut listed = Vec::with_capacity(items.len());
        for item in items {
            let Some(id) = listed_id::<I>(&item) else {
                continue;
            };
            // an entry that doesn't decode falls back to a point lookup
            let endpoint = match self.endpoint_of(item) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    tracing::warn!("undecodable listing entry {}: {}", id.describe(), e);
                    None
                },
            };
            listed.push(Listed { id, endpoint });
        }
        Ok(listed)
    }

    async fn list_secondary(&self, scope: &ListScope) -> Result<Vec<I>> {
        let request = Request::get(format!("{}/resources", scope.path()))
            .with_query("$filter", format!("resourceType eq '{}'", I::RESOURCE_TYPE));
        let items = self.fetch_all(request).await?;
        Ok(items.iter().filter_map(listed_id::<I>).collect())
    }

    async fn get(&self, id: &I) -> Result<String> {
        let response = self
            .transport
            .send(Request::get(id.id()))
            .await
            .map_err(|source| Error::TransientTransport { attempts: 1, source })?;
        if !response.is_success() {
            return Err(Error::from_response(&response));
        }

        let body: Value = response.json()?;
        self.endpoint_of(body)?.ok_or_else(|| Error::MissingEndpoint { id: id.id() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{KeyVaultId, ResourceGroupId, SubscriptionId};
    use crate::testing::{json_response, ScriptedTransport};
    use serde_json::json;

    const KV1: &str = "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv1";

    fn vault(id: &str, uri: &str) -> Value {
        json!({
            "id": id,
            "type": "Microsoft.KeyVault/vaults",
            "properties": { "vaultUri": uri }
        })
    }

    #[tokio::test]
    async fn test_primary_listing_follows_next_link() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json_response(
                200,
                json!({
                    "value": [vault(KV1, "https://kv1.vault.azure.net/")],
                    "nextLink": "https://management.example.test/page2"
                }),
            )),
            Ok(json_response(
                200,
                json!({
                    "value": [
                        vault(
                            "/SUBSCRIPTIONS/s1/resourcegroups/rg1/providers/microsoft.keyvault/vaults/kv2",
                            "https://kv2.vault.azure.net/"
                        ),
                        { "id": "/not/a/vault" }
                    ]
                }),
            )),
        ]));
        let source = ArmEndpointSource::<KeyVaultId>::new(transport.clone());

        let listed = source
            .list_primary(&ListScope::Subscription(SubscriptionId::new("s1")))
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].id.vault_name(), "kv2");
        assert_eq!(listed[1].endpoint.as_deref(), Some("https://kv2.vault.azure.net/"));

        let requests = transport.requests();
        assert_eq!(requests[0].0.path, "/subscriptions/s1/providers/Microsoft.KeyVault/vaults");
        assert_eq!(requests[1].0.path, "https://management.example.test/page2");
    }

    #[tokio::test]
    async fn test_partial_entry_does_not_sink_the_listing() {
        let kv2 = "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv2";
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json_response(
            200,
            json!({
                "value": [
                    vault(KV1, "https://kv1.vault.azure.net/"),
                    { "id": kv2, "type": "Microsoft.KeyVault/vaults" }
                ]
            }),
        ))]));
        let source = ArmEndpointSource::<KeyVaultId>::new(transport);

        let listed = source
            .list_primary(&ListScope::Subscription(SubscriptionId::new("s1")))
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].endpoint.as_deref(), Some("https://kv1.vault.azure.net/"));
        assert_eq!(listed[1].id.vault_name(), "kv2");
        assert_eq!(listed[1].endpoint, None);
    }

    #[tokio::test]
    async fn test_repeated_next_link_stops_paging() {
        let page = || {
            Ok(json_response(
                200,
                json!({
                    "value": [{ "id": KV1 }],
                    "nextLink": "https://management.example.test/again"
                }),
            ))
        };
        // a third request would hit an unscripted response and panic
        let transport = Arc::new(ScriptedTransport::new(vec![page(), page()]));
        let source = ArmEndpointSource::<KeyVaultId>::new(transport.clone());

        let ids = source
            .list_secondary(&ListScope::Subscription(SubscriptionId::new("s1")))
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_secondary_listing_filters_by_type() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json_response(
            200,
            json!({ "value": [{ "id": KV1, "type": "Microsoft.KeyVault/vaults" }] }),
        ))]));
        let source = ArmEndpointSource::<KeyVaultId>::new(transport.clone());

        let ids = source
            .list_secondary(&ListScope::ResourceGroup(ResourceGroupId::new("s1", "rg1")))
            .await
            .unwrap();

        assert_eq!(ids, vec![KeyVaultId::new("s1", "rg1", "kv1")]);
        let (request, _) = &transport.requests()[0];
        assert_eq!(request.path, "/subscriptions/s1/resourceGroups/rg1/resources");
        assert_eq!(
            request.query,
            vec![(
                "$filter".to_string(),
                "resourceType eq 'Microsoft.KeyVault/vaults'".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_point_lookup_classifies_failures() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json_response(404, json!({ "error": { "code": "ResourceNotFound", "message": "gone" } }))),
            Ok(json_response(403, json!(null))),
            Ok(json_response(200, json!({ "id": KV1, "type": "Microsoft.KeyVault/vaults", "properties": {} }))),
        ]));
        let source = ArmEndpointSource::<KeyVaultId>::new(transport);
        let id = KeyVaultId::new("s1", "rg1", "kv1");

        assert!(matches!(source.get(&id).await, Err(Error::NotFound)));
        assert!(matches!(source.get(&id).await, Err(Error::Forbidden)));
        assert!(matches!(source.get(&id).await, Err(Error::MissingEndpoint { .. })));
    }
}
