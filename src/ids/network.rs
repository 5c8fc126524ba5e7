use super::{Parsed, ParseErrorKind, ResourceId, ScopedResource, Segment};

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/virtualNetworks/{virtualNetworkName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualNetworkId {
    subscription_id: String,
    resource_group_name: String,
    virtual_network_name: String,
}

impl VirtualNetworkId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        virtual_network_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            virtual_network_name: virtual_network_name.into(),
        }
    }

    pub fn virtual_network_name(&self) -> &str {
        &self.virtual_network_name
    }

    pub fn subnet(&self, subnet_name: impl Into<String>) -> SubnetId {
        SubnetId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.virtual_network_name,
            subnet_name,
        )
    }
}

const VIRTUAL_NETWORK_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
    Segment::static_segment("staticResourceGroups", "resourceGroups"),
    Segment::user_specified("resourceGroupName"),
    Segment::static_segment("staticProviders", "providers"),
    Segment::provider("staticMicrosoftNetwork", "Microsoft.Network"),
    Segment::static_segment("staticVirtualNetworks", "virtualNetworks"),
    Segment::user_specified("virtualNetworkName"),
];

impl ResourceId for VirtualNetworkId {
    const DESCRIPTION: &'static str = "Virtual Network";

    fn segments() -> &'static [Segment] {
        VIRTUAL_NETWORK_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(
            parsed.value("subscriptionId")?,
            parsed.value("resourceGroupName")?,
            parsed.value("virtualNetworkName")?,
        ))
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.virtual_network_name.as_str(),
        ]
    }
}

impl ScopedResource for VirtualNetworkId {
    const RESOURCE_TYPE: &'static str = "Microsoft.Network/virtualNetworks";

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }
}

resource_id_impls!(VirtualNetworkId);

/// A subnet nested under a virtual network
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubnetId {
    subscription_id: String,
    resource_group_name: String,
    virtual_network_name: String,
    subnet_name: String,
}

impl SubnetId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        virtual_network_name: impl Into<String>,
        subnet_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            virtual_network_name: virtual_network_name.into(),
            subnet_name: subnet_name.into(),
        }
    }

    pub fn virtual_network_name(&self) -> &str {
        &self.virtual_network_name
    }

    pub fn subnet_name(&self) -> &str {
        &self.subnet_name
    }

    pub fn virtual_network(&self) -> VirtualNetworkId {
        VirtualNetworkId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.virtual_network_name,
        )
    }
}

const SUBNET_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
    Segment::static_segment("staticResourceGroups", "resourceGroups"),
    Segment::user_specified("resourceGroupName"),
    Segment::static_segment("staticProviders", "providers"),
    Segment::provider("staticMicrosoftNetwork", "Microsoft.Network"),
    Segment::static_segment("staticVirtualNetworks", "virtualNetworks"),
    Segment::user_specified("virtualNetworkName"),
    Segment::static_segment("staticSubnets", "subnets"),
    Segment::user_specified("subnetName"),
];

impl ResourceId for SubnetId {
    const DESCRIPTION: &'static str = "Subnet";

    fn segments() -> &'static [Segment] {
        SUBNET_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(
            parsed.value("subscriptionId")?,
            parsed.value("resourceGroupName")?,
            parsed.value("virtualNetworkName")?,
            parsed.value("subnetName")?,
        ))
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.virtual_network_name.as_str(),
            self.subnet_name.as_str(),
        ]
    }
}

impl ScopedResource for SubnetId {
    const RESOURCE_TYPE: &'static str = "Microsoft.Network/virtualNetworks/subnets";

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }
}

resource_id_impls!(SubnetId);
