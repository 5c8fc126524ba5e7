use super::{Parsed, ParseErrorKind, ResourceGroupId, ResourceId, ScopedResource, Segment};

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.KeyVault/vaults/{vaultName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyVaultId {
    subscription_id: String,
    resource_group_name: String,
    vault_name: String,
}

impl KeyVaultId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        vault_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            vault_name: vault_name.into(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }

    pub fn vault_name(&self) -> &str {
        &self.vault_name
    }

    /// The soft-deleted form of this vault, which is scoped by location rather than resource group
    pub fn deleted(&self, location_name: impl Into<String>) -> DeletedVaultId {
        DeletedVaultId::new(&self.subscription_id, location_name, &self.vault_name)
    }
}

const KEY_VAULT_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
    Segment::static_segment("staticResourceGroups", "resourceGroups"),
    Segment::user_specified("resourceGroupName"),
    Segment::static_segment("staticProviders", "providers"),
    Segment::provider("staticMicrosoftKeyVault", "Microsoft.KeyVault"),
    Segment::static_segment("staticVaults", "vaults"),
    Segment::user_specified("vaultName"),
];

impl ResourceId for KeyVaultId {
    const DESCRIPTION: &'static str = "Key Vault";

    fn segments() -> &'static [Segment] {
        KEY_VAULT_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(
            parsed.value("subscriptionId")?,
            parsed.value("resourceGroupName")?,
            parsed.value("vaultName")?,
        ))
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.vault_name.as_str(),
        ]
    }
}

impl ScopedResource for KeyVaultId {
    const RESOURCE_TYPE: &'static str = "Microsoft.KeyVault/vaults";

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }
}

impl From<&KeyVaultId> for ResourceGroupId {
    fn from(id: &KeyVaultId) -> Self {
        ResourceGroupId::new(&id.subscription_id, &id.resource_group_name)
    }
}

resource_id_impls!(KeyVaultId);

/// `/subscriptions/{subscriptionId}/providers/Microsoft.KeyVault/locations/{locationName}/deletedVaults/{deletedVaultName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletedVaultId {
    subscription_id: String,
    location_name: String,
    deleted_vault_name: String,
}

impl DeletedVaultId {
    pub fn new(
        subscription_id: impl Into<String>,
        location_name: impl Into<String>,
        deleted_vault_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            location_name: location_name.into(),
            deleted_vault_name: deleted_vault_name.into(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn location_name(&self) -> &str {
        &self.location_name
    }

    pub fn deleted_vault_name(&self) -> &str {
        &self.deleted_vault_name
    }
}

const DELETED_VAULT_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
    Segment::static_segment("staticProviders", "providers"),
    Segment::provider("staticMicrosoftKeyVault", "Microsoft.KeyVault"),
    Segment::static_segment("staticLocations", "locations"),
    Segment::user_specified("locationName"),
    Segment::static_segment("staticDeletedVaults", "deletedVaults"),
    Segment::user_specified("deletedVaultName"),
];

impl ResourceId for DeletedVaultId {
    const DESCRIPTION: &'static str = "Deleted Vault";

    fn segments() -> &'static [Segment] {
        DELETED_VAULT_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(
            parsed.value("subscriptionId")?,
            parsed.value("locationName")?,
            parsed.value("deletedVaultName")?,
        ))
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.subscription_id.as_str(),
            self.location_name.as_str(),
            self.deleted_vault_name.as_str(),
        ]
    }
}

resource_id_impls!(DeletedVaultId);
