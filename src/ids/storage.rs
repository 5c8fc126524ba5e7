use super::{Parsed, ParseErrorKind, ResourceId, ScopedResource, Segment};

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Storage/storageAccounts/{storageAccountName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageAccountId {
    subscription_id: String,
    resource_group_name: String,
    storage_account_name: String,
}

impl StorageAccountId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        storage_account_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            storage_account_name: storage_account_name.into(),
        }
    }

    pub fn storage_account_name(&self) -> &str {
        &self.storage_account_name
    }
}

const STORAGE_ACCOUNT_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
    Segment::static_segment("staticResourceGroups", "resourceGroups"),
    Segment::user_specified("resourceGroupName"),
    Segment::static_segment("staticProviders", "providers"),
    Segment::provider("staticMicrosoftStorage", "Microsoft.Storage"),
    Segment::static_segment("staticStorageAccounts", "storageAccounts"),
    Segment::user_specified("storageAccountName"),
];

impl ResourceId for StorageAccountId {
    const DESCRIPTION: &'static str = "Storage Account";

    fn segments() -> &'static [Segment] {
        STORAGE_ACCOUNT_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(
            parsed.value("subscriptionId")?,
            parsed.value("resourceGroupName")?,
            parsed.value("storageAccountName")?,
        ))
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.storage_account_name.as_str(),
        ]
    }
}

impl ScopedResource for StorageAccountId {
    const RESOURCE_TYPE: &'static str = "Microsoft.Storage/storageAccounts";

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }
}

resource_id_impls!(StorageAccountId);
