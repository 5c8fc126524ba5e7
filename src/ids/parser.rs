//! Table-driven parsing, rendering and validation of resource identifiers

use super::segment::{expected_shape, Segment, SegmentKind};
use super::ResourceId;

/// Why an identifier failed to parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected {expected} segments but found {actual}")]
    SegmentCountMismatch { expected: usize, actual: usize },

    #[error("identifiers must begin with '/'")]
    MissingLeadingSlash,

    #[error("the segment {segment:?} was empty")]
    SegmentNotFound { segment: &'static str },

    #[error("the segment {segment:?} should be {expected:?} but was {actual:?}")]
    UnexpectedLiteral {
        segment: &'static str,
        expected: &'static str,
        actual: String,
    },
}

/// A failed parse, carrying the input and the identifier type it was parsed as
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parsing {input:?} as {description} (expected {shape}): {kind}")]
pub struct ParseError {
    pub input: String,
    pub description: &'static str,
    pub shape: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    fn new<T: ResourceId>(input: &str, kind: ParseErrorKind) -> Self {
        Self {
            input: input.to_string(),
            description: T::DESCRIPTION,
            shape: expected_shape(T::segments()),
            kind,
        }
    }
}

/// Values captured for the value segments of an identifier, in path order
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    values: Vec<(Segment, String)>,
}

impl Parsed {
    /// Value captured for the named segment
    pub fn value(&self, name: &'static str) -> Result<String, ParseErrorKind> {
        self.values
            .iter()
            .find(|(segment, _)| segment.name == name)
            .map(|(_, value)| value.clone())
            .ok_or(ParseErrorKind::SegmentNotFound { segment: name })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Segment, &str)> {
        self.values.iter().map(|(s, v)| (s, v.as_str()))
    }
}

/// Split `input` and match it positionally against `segments`.
///
/// The segment count is checked before anything else, so any input with the
/// wrong number of components fails with `SegmentCountMismatch`.
pub fn parse_segments(
    segments: &[Segment],
    input: &str,
    insensitive: bool,
) -> Result<Parsed, ParseErrorKind> {
    let body = input.strip_prefix('/').unwrap_or(input);
    let parts: Vec<&str> = body.split('/').collect();

    if parts.len() != segments.len() {
        return Err(ParseErrorKind::SegmentCountMismatch {
            expected: segments.len(),
            actual: parts.len(),
        });
    }

    if !input.starts_with('/') {
        return Err(ParseErrorKind::MissingLeadingSlash);
    }

    let mut parsed = Parsed::default();
    for (segment, part) in segments.iter().zip(parts) {
        match segment.literal() {
            Some(expected) => {
                if !segment.matches_literal(part, insensitive) {
                    return Err(ParseErrorKind::UnexpectedLiteral {
                        segment: segment.name,
                        expected,
                        actual: part.to_string(),
                    });
                }
            },
            None => {
                if part.is_empty() {
                    return Err(ParseErrorKind::SegmentNotFound {
                        segment: segment.name,
                    });
                }
                parsed.values.push((*segment, part.to_string()));
            },
        }
    }

    Ok(parsed)
}

/// Parse `input` as identifier type `T`.
///
/// With `insensitive` set, static and provider literals match regardless of
/// case; user-supplied values always keep the casing they arrived with.
pub fn parse<T: ResourceId>(input: &str, insensitive: bool) -> Result<T, ParseError> {
    let parsed = parse_segments(T::segments(), input, insensitive)
        .map_err(|kind| ParseError::new::<T>(input, kind))?;
    T::from_parsed(&parsed).map_err(|kind| ParseError::new::<T>(input, kind))
}

/// Reconstruct the canonical path of an identifier from its segment table
pub fn render<T: ResourceId>(id: &T) -> String {
    let mut values = id.values().into_iter();
    let mut out = String::new();
    for segment in T::segments() {
        out.push('/');
        match segment.literal() {
            Some(literal) => out.push_str(literal),
            None => out.push_str(values.next().unwrap_or_default()),
        }
    }
    debug_assert!(values.next().is_none(), "{} has surplus values", T::DESCRIPTION);
    out
}

/// Outcome of validating user input without aborting the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub warnings: Vec<String>,
    pub errors: Vec<ParseError>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate user input as identifier type `T` (strict mode).
///
/// Subscription segments that are not UUID-shaped produce a warning rather
/// than an error.
pub fn validate<T: ResourceId>(input: &str) -> Validation {
    let mut validation = Validation::default();

    let parsed = match parse_segments(T::segments(), input, false) {
        Ok(parsed) => parsed,
        Err(kind) => {
            validation.errors.push(ParseError::new::<T>(input, kind));
            return validation;
        },
    };

    for (segment, value) in parsed.iter() {
        if segment.kind == SegmentKind::SubscriptionId && uuid::Uuid::parse_str(value).is_err() {
            validation.warnings.push(format!(
                "{}: the segment {:?} should be a UUID but was {:?}",
                T::DESCRIPTION,
                segment.name,
                value
            ));
        }
    }

    if let Err(kind) = T::from_parsed(&parsed) {
        validation.errors.push(ParseError::new::<T>(input, kind));
    }

    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{KeyVaultId, ResourceGroupId, WidgetId};

    const SUB: &str = "00000000-0000-0000-0000-000000000000";

    #[test]
    fn test_widget_scenario() {
        let raw = format!(
            "/subscriptions/{SUB}/resourceGroups/rg1/providers/Microsoft.Example/widgets/w1"
        );
        let id: WidgetId = parse(&raw, false).unwrap();
        assert_eq!(id.subscription_id(), SUB);
        assert_eq!(id.resource_group_name(), "rg1");
        assert_eq!(id.widget_name(), "w1");
        assert_eq!(render(&id), raw);
    }

    #[test]
    fn test_segment_count_is_checked_first() {
        let err = parse::<KeyVaultId>("subscriptions/x", false).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::SegmentCountMismatch {
                expected: 8,
                actual: 2
            }
        );
    }

    #[test]
    fn test_missing_leading_slash() {
        let err = parse::<ResourceGroupId>("subscriptions/s/resourceGroups/rg", false).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingLeadingSlash);
    }

    #[test]
    fn test_empty_value_segment() {
        let err = parse::<ResourceGroupId>("/subscriptions//resourceGroups/rg", false).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::SegmentNotFound {
                segment: "subscriptionId"
            }
        );
    }

    #[test]
    fn test_unexpected_literal_names_the_segment() {
        let err = parse::<ResourceGroupId>("/subscriptions/s/resourcegroups/rg", false).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnexpectedLiteral {
                segment: "staticResourceGroups",
                expected: "resourceGroups",
                actual: "resourcegroups".to_string(),
            }
        );
        assert!(err.to_string().contains("Resource Group"));
    }

    #[test]
    fn test_insensitive_parse_keeps_user_casing() {
        let raw = format!("/SUBSCRIPTIONS/{SUB}/RESOURCEGROUPS/My-RG/PROVIDERS/microsoft.keyvault/VAULTS/MyVault");
        let id: KeyVaultId = parse(&raw, true).unwrap();
        assert_eq!(id.resource_group_name(), "My-RG");
        assert_eq!(id.vault_name(), "MyVault");
        assert!(parse::<KeyVaultId>(&raw, false).is_err());
    }

    #[test]
    fn test_validate_warns_on_non_uuid_subscription() {
        let validation = validate::<ResourceGroupId>("/subscriptions/not-a-uuid/resourceGroups/rg");
        assert!(validation.is_ok());
        assert_eq!(validation.warnings.len(), 1);

        let validation = validate::<ResourceGroupId>(&format!("/subscriptions/{SUB}/resourceGroups/rg"));
        assert!(validation.is_ok());
        assert!(validation.warnings.is_empty());
    }

    #[test]
    fn test_validate_collects_errors_without_panicking() {
        let validation = validate::<KeyVaultId>("/nope");
        assert!(!validation.is_ok());
        assert_eq!(validation.errors.len(), 1);
    }
}
