// ── Canonical attribute values ──
//
// One tagged union covers every supported kind. Absence is represented
// inside each variant, never as a missing attribute: a fetched record
// always exposes its full field list, present or not.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::kind::AttributeKind;

/// A record reference: id plus the referenced type and, when the backend
/// sent one, the referenced record's display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Option<Uuid>,
    pub target: Option<String>,
    pub name: Option<String>,
}

impl Reference {
    pub fn new(id: Uuid, target: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            target: Some(target.into()),
            name: None,
        }
    }

    /// Display name, falling back to the id text. Empty when unset.
    pub fn display(&self) -> String {
        match (&self.name, &self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// The canonical value of one attribute.
///
/// The variant is fixed for the attribute's lifetime; only its payload
/// changes. See [`AttributeKind`] for the per-kind decode/encode rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Boolean {
        value: Option<bool>,
        true_label: Option<String>,
        false_label: Option<String>,
    },
    Integer(Option<i32>),
    BigInt(Option<i64>),
    /// Validated decimal literal, kept textually exact.
    Decimal(Option<String>),
    Float(Option<f64>),
    /// Validated currency literal, kept textually exact.
    Money(Option<String>),
    DateTime(Option<DateTime<Utc>>),
    Text(Option<String>),
    Memo(Option<String>),
    OptionSet {
        selected: Option<i32>,
        /// Every (code, label) pair ever observed for this attribute, so
        /// a set-by-code can restore the decoded label.
        labels: BTreeMap<i32, String>,
    },
    Reference(Reference),
    PartyList(Vec<Reference>),
    EntityName(Option<String>),
    Key(Option<Uuid>),
    /// Raw native payload, retained untouched for write-back.
    Unsupported(Value),
}

impl AttributeValue {
    /// The empty value of the given kind.
    pub fn empty_of(kind: AttributeKind) -> Self {
        match kind {
            AttributeKind::Boolean => Self::Boolean {
                value: None,
                true_label: None,
                false_label: None,
            },
            AttributeKind::Integer => Self::Integer(None),
            AttributeKind::BigInt => Self::BigInt(None),
            AttributeKind::Decimal => Self::Decimal(None),
            AttributeKind::Float => Self::Float(None),
            AttributeKind::Money => Self::Money(None),
            AttributeKind::DateTime => Self::DateTime(None),
            AttributeKind::Text => Self::Text(None),
            AttributeKind::Memo => Self::Memo(None),
            AttributeKind::OptionSet => Self::OptionSet {
                selected: None,
                labels: BTreeMap::new(),
            },
            AttributeKind::Lookup | AttributeKind::Owner | AttributeKind::Customer => {
                Self::Reference(Reference::default())
            }
            AttributeKind::PartyList => Self::PartyList(Vec::new()),
            AttributeKind::EntityName => Self::EntityName(None),
            AttributeKind::Key => Self::Key(None),
            AttributeKind::Unsupported => Self::Unsupported(Value::Null),
        }
    }

    /// The kind this value shape belongs to. Reference-family variants
    /// report `Lookup`; the owning attribute keeps the precise kind.
    pub fn kind_hint(&self) -> AttributeKind {
        match self {
            Self::Boolean { .. } => AttributeKind::Boolean,
            Self::Integer(_) => AttributeKind::Integer,
            Self::BigInt(_) => AttributeKind::BigInt,
            Self::Decimal(_) => AttributeKind::Decimal,
            Self::Float(_) => AttributeKind::Float,
            Self::Money(_) => AttributeKind::Money,
            Self::DateTime(_) => AttributeKind::DateTime,
            Self::Text(_) => AttributeKind::Text,
            Self::Memo(_) => AttributeKind::Memo,
            Self::OptionSet { .. } => AttributeKind::OptionSet,
            Self::Reference(_) => AttributeKind::Lookup,
            Self::PartyList(_) => AttributeKind::PartyList,
            Self::EntityName(_) => AttributeKind::EntityName,
            Self::Key(_) => AttributeKind::Key,
            Self::Unsupported(_) => AttributeKind::Unsupported,
        }
    }

    /// The canonical string form. Total: unrepresentable or absent
    /// values come back as the empty string.
    pub fn canonical_string(&self) -> String {
        match self {
            Self::Boolean {
                value: None, ..
            } => String::new(),
            Self::Boolean {
                value: Some(true),
                true_label,
                ..
            } => true_label.clone().unwrap_or_else(|| "true".to_owned()),
            Self::Boolean {
                value: Some(false),
                false_label,
                ..
            } => false_label.clone().unwrap_or_else(|| "false".to_owned()),
            Self::Integer(v) => v.map(|n| n.to_string()).unwrap_or_default(),
            Self::BigInt(v) => v.map(|n| n.to_string()).unwrap_or_default(),
            Self::Float(v) => v.map(|n| n.to_string()).unwrap_or_default(),
            Self::Decimal(v) | Self::Money(v) => v.clone().unwrap_or_default(),
            Self::DateTime(v) => v
                .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                .unwrap_or_default(),
            Self::Text(v) | Self::Memo(v) | Self::EntityName(v) => v.clone().unwrap_or_default(),
            Self::OptionSet { selected, labels } => selected
                .map(|code| {
                    labels
                        .get(&code)
                        .cloned()
                        .unwrap_or_else(|| code.to_string())
                })
                .unwrap_or_default(),
            Self::Reference(r) => r.display(),
            Self::PartyList(parties) => parties.first().map(Reference::display).unwrap_or_default(),
            Self::Key(v) => v.map(|id| id.to_string()).unwrap_or_default(),
            Self::Unsupported(_) => String::new(),
        }
    }

    /// Apply a canonical string to this value. Best effort: a string
    /// that fails to parse for the variant leaves the value untouched
    /// and returns `false`. `target` is the out-of-band referenced-type
    /// token for reference kinds.
    pub fn apply_string(&mut self, raw: &str, target: Option<&str>) -> bool {
        match self {
            Self::Boolean {
                value,
                true_label,
                false_label,
            } => {
                let labels = (true_label.as_deref(), false_label.as_deref());
                *value = Some(parse_permissive_bool(raw, labels));
                true
            }
            Self::Integer(v) => apply_parsed(v, raw),
            Self::BigInt(v) => apply_parsed(v, raw),
            Self::Float(v) => apply_parsed(v, raw),
            Self::Decimal(v) | Self::Money(v) => match normalize_decimal(raw) {
                Some(text) => {
                    *v = Some(text);
                    true
                }
                None => false,
            },
            Self::DateTime(v) => match parse_datetime(raw) {
                Some(dt) => {
                    *v = Some(dt);
                    true
                }
                None => false,
            },
            Self::Text(v) | Self::Memo(v) | Self::EntityName(v) => {
                *v = Some(raw.to_owned());
                true
            }
            // Empty or non-numeric input is the explicit null-option
            // marker, not a no-op.
            Self::OptionSet { selected, .. } => {
                *selected = raw.trim().parse::<i32>().ok();
                true
            }
            Self::Reference(r) => match Uuid::parse_str(raw.trim()) {
                Ok(id) => {
                    r.id = Some(id);
                    if let Some(t) = target {
                        r.target = Some(t.to_owned());
                    }
                    // The old display name no longer describes this id.
                    r.name = None;
                    true
                }
                Err(_) => false,
            },
            // Write-as-singleton: the whole list is replaced by one
            // synthetic reference built from the string.
            Self::PartyList(parties) => match Uuid::parse_str(raw.trim()) {
                Ok(id) => {
                    *parties = vec![Reference {
                        id: Some(id),
                        target: target.map(ToOwned::to_owned),
                        name: None,
                    }];
                    true
                }
                Err(_) => false,
            },
            Self::Key(v) => match Uuid::parse_str(raw.trim()) {
                Ok(id) => {
                    *v = Some(id);
                    true
                }
                Err(_) => false,
            },
            Self::Unsupported(_) => false,
        }
    }
}

fn apply_parsed<T: std::str::FromStr>(slot: &mut Option<T>, raw: &str) -> bool {
    match raw.trim().parse::<T>() {
        Ok(v) => {
            *slot = Some(v);
            true
        }
        Err(_) => false,
    }
}

/// Permissive boolean parse: recognized truthy/falsy literals and the
/// attribute's own labels; anything ambiguous defaults to `false`.
fn parse_permissive_bool(raw: &str, labels: (Option<&str>, Option<&str>)) -> bool {
    let (true_label, false_label) = labels;
    if true_label.is_some_and(|l| l.eq_ignore_ascii_case(raw.trim())) {
        return true;
    }
    if false_label.is_some_and(|l| l.eq_ignore_ascii_case(raw.trim())) {
        return false;
    }
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

/// Validate and trim a decimal literal; `None` if it is not one.
pub(crate) fn normalize_decimal(raw: &str) -> Option<String> {
    let text = raw.trim();
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    if unsigned.is_empty() {
        return None;
    }
    let mut dots = 0;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => {}
            '.' => dots += 1,
            _ => return None,
        }
    }
    if dots > 1 || unsigned == "." {
        return None;
    }
    Some(text.to_owned())
}

/// Accept RFC 3339 or a handful of general date formats; normalize to UTC.
pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn boolean_decodes_to_labels_when_known() {
        let v = AttributeValue::Boolean {
            value: Some(true),
            true_label: Some("Allow".into()),
            false_label: Some("Deny".into()),
        };
        assert_eq!(v.canonical_string(), "Allow");
    }

    #[test]
    fn boolean_parse_accepts_own_labels() {
        let mut v = AttributeValue::Boolean {
            value: Some(false),
            true_label: Some("Allow".into()),
            false_label: Some("Deny".into()),
        };
        assert!(v.apply_string("allow", None));
        assert_eq!(v.canonical_string(), "Allow");
    }

    #[test]
    fn boolean_ambiguous_input_defaults_false() {
        let mut v = AttributeValue::empty_of(AttributeKind::Boolean);
        assert!(v.apply_string("perhaps", None));
        assert_eq!(v.canonical_string(), "false");
    }

    #[test]
    fn decimal_kept_textually_exact() {
        let mut v = AttributeValue::empty_of(AttributeKind::Money);
        assert!(v.apply_string("1500.00", None));
        assert_eq!(v.canonical_string(), "1500.00");
    }

    #[test]
    fn decimal_rejects_garbage() {
        let mut v = AttributeValue::Decimal(Some("2.50".into()));
        assert!(!v.apply_string("2.5.0", None));
        assert!(!v.apply_string("12a", None));
        assert_eq!(v.canonical_string(), "2.50");
    }

    #[test]
    fn datetime_general_parse_normalizes_to_utc() {
        let mut v = AttributeValue::empty_of(AttributeKind::DateTime);
        assert!(v.apply_string("2011-05-04 10:30:00", None));
        assert_eq!(v.canonical_string(), "2011-05-04T10:30:00Z");

        assert!(v.apply_string("2011-05-04T08:00:00+02:00", None));
        assert_eq!(v.canonical_string(), "2011-05-04T06:00:00Z");
    }

    #[test]
    fn option_set_empty_input_sets_null_marker() {
        let mut v = AttributeValue::OptionSet {
            selected: Some(1),
            labels: BTreeMap::from([(1, "Active".to_owned())]),
        };
        assert!(v.apply_string("", None));
        assert_eq!(v.canonical_string(), "");
    }

    #[test]
    fn reference_falls_back_to_id_text() {
        let id = Uuid::parse_str("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9").unwrap();
        let mut v = AttributeValue::empty_of(AttributeKind::Lookup);
        assert!(v.apply_string(&id.to_string(), Some("systemuser")));
        assert_eq!(v.canonical_string(), id.to_string());
    }

    #[test]
    fn party_list_write_as_singleton() {
        let mut v = AttributeValue::PartyList(vec![
            Reference {
                id: None,
                target: Some("systemuser".into()),
                name: Some("Jane Doe".into()),
            },
            Reference {
                id: None,
                target: Some("systemuser".into()),
                name: Some("John Boss".into()),
            },
        ]);
        assert_eq!(v.canonical_string(), "Jane Doe");

        let id = Uuid::new_v4();
        assert!(v.apply_string(&id.to_string(), Some("queue")));
        let AttributeValue::PartyList(parties) = &v else {
            panic!("variant changed");
        };
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].id, Some(id));
        assert_eq!(parties[0].target.as_deref(), Some("queue"));
    }

    #[test]
    fn unsupported_ignores_writes() {
        let mut v = AttributeValue::Unsupported(serde_json::json!({"weird": 1}));
        assert!(!v.apply_string("anything", None));
        assert_eq!(v.canonical_string(), "");
    }
}
