use super::{Parsed, ParseErrorKind, ResourceId, ScopedResource, Segment};

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Example/widgets/{widgetName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidgetId {
    subscription_id: String,
    resource_group_name: String,
    widget_name: String,
}

impl WidgetId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        widget_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            widget_name: widget_name.into(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }

    pub fn widget_name(&self) -> &str {
        &self.widget_name
    }
}

const WIDGET_SEGMENTS: &[Segment] = &[
    Segment::static_segment("staticSubscriptions", "subscriptions"),
    Segment::subscription_id("subscriptionId"),
    Segment::static_segment("staticResourceGroups", "resourceGroups"),
    Segment::user_specified("resourceGroupName"),
    Segment::static_segment("staticProviders", "providers"),
    Segment::provider("staticMicrosoftExample", "Microsoft.Example"),
    Segment::static_segment("staticWidgets", "widgets"),
    Segment::user_specified("widgetName"),
];

impl ResourceId for WidgetId {
    const DESCRIPTION: &'static str = "Widget";

    fn segments() -> &'static [Segment] {
        WIDGET_SEGMENTS
    }

    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind> {
        Ok(Self::new(
            parsed.value("subscriptionId")?,
            parsed.value("resourceGroupName")?,
            parsed.value("widgetName")?,
        ))
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.widget_name.as_str(),
        ]
    }
}

impl ScopedResource for WidgetId {
    const RESOURCE_TYPE: &'static str = "Microsoft.Example/widgets";

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group_name
    }
}

resource_id_impls!(WidgetId);
