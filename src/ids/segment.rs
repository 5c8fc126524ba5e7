//! Segment declarations shared by every identifier type

/// What a single `/`-delimited component of an identifier may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// A fixed literal such as `resourceGroups`
    Static(&'static str),
    /// A resource provider namespace such as `Microsoft.KeyVault`
    ResourceProvider(&'static str),
    /// A name chosen by the user; any non-empty value
    UserSpecified,
    /// A subscription (or tenant) scalar; any non-empty value, UUID-shaped by convention
    SubscriptionId,
}

/// One named entry in an identifier type's segment table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub name: &'static str,
    pub kind: SegmentKind,
}

impl Segment {
    pub const fn static_segment(name: &'static str, literal: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::Static(literal),
        }
    }

    pub const fn provider(name: &'static str, namespace: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::ResourceProvider(namespace),
        }
    }

    pub const fn user_specified(name: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::UserSpecified,
        }
    }

    pub const fn subscription_id(name: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::SubscriptionId,
        }
    }

    /// The literal this segment must match, if it is not a value segment
    pub fn literal(&self) -> Option<&'static str> {
        match self.kind {
            SegmentKind::Static(literal) | SegmentKind::ResourceProvider(literal) => Some(literal),
            SegmentKind::UserSpecified | SegmentKind::SubscriptionId => None,
        }
    }

    pub fn is_value(&self) -> bool {
        self.literal().is_none()
    }

    /// Placeholder used when printing the expected shape of an identifier
    pub fn example(&self) -> String {
        match self.literal() {
            Some(literal) => literal.to_string(),
            None => format!("{{{}}}", self.name),
        }
    }

    /// Check a candidate path component against this segment's literal
    pub(crate) fn matches_literal(&self, candidate: &str, insensitive: bool) -> bool {
        match self.literal() {
            Some(literal) if insensitive => literal.eq_ignore_ascii_case(candidate),
            Some(literal) => literal == candidate,
            None => true,
        }
    }
}

/// Render the expected shape of an identifier, e.g. `/subscriptions/{subscriptionId}`
pub fn expected_shape(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.example()))
        .collect()
}
