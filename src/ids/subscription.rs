use super::{Parsed, ParseErrorKind, ResourceId, Segment};

/// `/subscriptions/{subscriptionId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    subscription_id: String,
}

impl SubscriptionId {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }
}

const SUBSCRIPTION_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
];

impl ResourceId for SubscriptionId {
    const DESCRIPTION: &'static str = "Subscription";

    fn segments() -> &'static [Segment] {
        SUBSCRIPTION_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(parsed.value("subscriptionId")?))
    }

    fn values(&self) -> Vec<&str> {
        vec![self.subscription_id.as_str()]
    }
}

resource_id_impls!(SubscriptionId);

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceGroupId {
    subscription_id: String,
    resource_group_name: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: impl Into<String>, resource_group_name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }

    pub fn subscription(&self) -> SubscriptionId {
        SubscriptionId::new(&self.subscription_id)
    }
}

const RESOURCE_GROUP_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
    Segment::static_segment("staticResourceGroups", "resourceGroups"),
    Segment::user_specified("resourceGroupName"),
];

impl ResourceId for ResourceGroupId {
    const DESCRIPTION: &'static str = "Resource Group";

    fn segments() -> &'static [Segment] {
        RESOURCE_GROUP_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(
            parsed.value("subscriptionId")?,
            parsed.value("resourceGroupName")?,
        ))
    }

    fn values(&self) -> Vec<&str> {
        vec![self.subscription_id.as_str(), self.resource_group_name.as_str()]
    }
}

resource_id_impls!(ResourceGroupId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_round_trip() {
        let id = SubscriptionId::new("11111111-1111-1111-1111-111111111111");
        assert_eq!(id.to_string(), "/subscriptions/11111111-1111-1111-1111-111111111111");
        assert_eq!(SubscriptionId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn test_resource_group_describe() {
        let id = ResourceGroupId::new("sub", "rg1");
        assert_eq!(
            id.describe(),
            r#"Resource Group (subscriptionId: "sub", resourceGroupName: "rg1")"#
        );
        assert_eq!(id.subscription(), SubscriptionId::new("sub"));
    }

    #[test]
    fn test_serde_uses_path_form() {
        let id = ResourceGroupId::new("sub", "rg1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""/subscriptions/sub/resourceGroups/rg1""#);

        let back: ResourceGroupId =
            serde_json::from_str(r#""/SUBSCRIPTIONS/sub/resourcegroups/rg1""#).unwrap();
        assert_eq!(back, id);
    }
}
