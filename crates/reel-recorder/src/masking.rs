//! Sensitive-value masking for recorded events.
//!
//! The [`MaskingFilter`] inspects `click` and `dom_attribute_modified`
//! events before they are appended to the log and replaces values that
//! belong to sensitive form fields with a fixed marker. Built-in matchers
//! cover password/secret/token-named inputs; callers can append their own
//! selector patterns, which never replace the defaults.
//!
//! Click events carry the target element inline (tag plus attribute map),
//! so matchers evaluate against those attributes directly. Attribute
//! mutation events carry only a node id, so they are matched on the
//! modified attribute's name instead: `value` and any name containing a
//! matcher pattern count as sensitive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use regex::Regex;
use reel_types::RecorderError;
use serde_json::Value;

use crate::event::{kind, RecordedEvent};

/// Replacement written over sensitive values. Empty values stay empty.
pub const MASKED_VALUE: &str = "***MASKED***";

/// Element attribute a matcher inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeField {
    Type,
    Name,
    Id,
}

impl AttributeField {
    fn as_str(self) -> &'static str {
        match self {
            AttributeField::Type => "type",
            AttributeField::Name => "name",
            AttributeField::Id => "id",
        }
    }
}

/// One sensitive-field matcher: a tag plus a case-insensitive substring
/// pattern over one attribute, parsed from a CSS-selector-like string
/// such as `input[name*='token']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveMatcher {
    tag: String,
    field: AttributeField,
    pattern: String,
}

fn selector_grammar() -> Option<&'static Regex> {
    static GRAMMAR: OnceLock<Option<Regex>> = OnceLock::new();
    GRAMMAR
        .get_or_init(|| {
            // tag[field=value], tag[field*=value], optional quotes around value.
            Regex::new(
                r#"(?i)^\s*([a-z][a-z0-9-]*)\[\s*(type|name|id)\s*\*?=\s*["']?([^"'\]]+?)["']?\s*\]\s*$"#,
            )
            .ok()
        })
        .as_ref()
}

impl SensitiveMatcher {
    fn new(tag: &str, field: AttributeField, pattern: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            field,
            pattern: pattern.to_ascii_lowercase(),
        }
    }

    /// Parses a selector pattern, rejecting anything outside the supported
    /// `tag[field*=value]` grammar with a validation error.
    pub fn parse(selector: &str) -> Result<Self, RecorderError> {
        let captures = selector_grammar()
            .and_then(|grammar| grammar.captures(selector))
            .ok_or_else(|| {
                RecorderError::validation(format!(
                    "unsupported sensitive selector {selector:?}: expected tag[type|name|id*=value]"
                ))
            })?;
        let field = match captures[2].to_ascii_lowercase().as_str() {
            "type" => AttributeField::Type,
            "name" => AttributeField::Name,
            _ => AttributeField::Id,
        };
        Ok(Self::new(&captures[1], field, captures[3].trim()))
    }

    fn matches_element(&self, tag: &str, attribute: impl Fn(&str) -> Option<String>) -> bool {
        if !tag.eq_ignore_ascii_case(&self.tag) {
            return false;
        }
        attribute(self.field.as_str())
            .map(|value| value.to_ascii_lowercase().contains(&self.pattern))
            .unwrap_or(false)
    }

    fn matches_attribute_name(&self, name: &str) -> bool {
        name.to_ascii_lowercase().contains(&self.pattern)
    }
}

fn default_matchers() -> Vec<SensitiveMatcher> {
    vec![
        SensitiveMatcher::new("input", AttributeField::Type, "password"),
        SensitiveMatcher::new("input", AttributeField::Name, "password"),
        SensitiveMatcher::new("input", AttributeField::Name, "passwd"),
        SensitiveMatcher::new("input", AttributeField::Id, "password"),
        SensitiveMatcher::new("input", AttributeField::Name, "secret"),
        SensitiveMatcher::new("input", AttributeField::Name, "token"),
    ]
}

/// Masks sensitive values in events before they reach the log.
#[derive(Debug)]
pub struct MaskingFilter {
    matchers: Vec<SensitiveMatcher>,
    masked_total: AtomicU64,
}

impl MaskingFilter {
    /// Builds a filter from the built-in matchers plus caller-supplied
    /// selector patterns. Custom patterns are appended, never substituted.
    ///
    /// Returns a validation error if any custom selector fails to parse.
    pub fn new(custom_selectors: &[String]) -> Result<Self, RecorderError> {
        let mut matchers = default_matchers();
        for selector in custom_selectors {
            matchers.push(SensitiveMatcher::parse(selector)?);
        }
        Ok(Self {
            matchers,
            masked_total: AtomicU64::new(0),
        })
    }

    /// Builds a filter with exactly the given matchers. An empty set makes
    /// the filter an identity transform.
    pub fn with_matchers(matchers: Vec<SensitiveMatcher>) -> Self {
        Self {
            matchers,
            masked_total: AtomicU64::new(0),
        }
    }

    /// Number of events this filter has masked. Statistics only; the
    /// authoritative record is the `masked` flag on each event.
    pub fn masked_total(&self) -> u64 {
        self.masked_total.load(Ordering::Relaxed)
    }

    /// Applies masking in place. Only `click` and `dom_attribute_modified`
    /// events are candidates; every other kind passes through unchanged.
    pub fn apply(&self, event: &mut RecordedEvent) {
        if self.matchers.is_empty() {
            return;
        }
        let masked = match event.kind.as_str() {
            kind::CLICK => self.mask_click(&mut event.data),
            kind::DOM_ATTRIBUTE_MODIFIED => self.mask_attribute(&mut event.data),
            _ => false,
        };
        if masked {
            event.masked = true;
            self.masked_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn mask_click(&self, data: &mut Value) -> bool {
        let tag = match data.get("tagName").and_then(Value::as_str) {
            Some(tag) => tag.to_owned(),
            None => return false,
        };
        let element_id = data.get("id").and_then(Value::as_str).map(str::to_owned);
        let lookup = |field: &str| -> Option<String> {
            let from_map = data
                .get("attributes")
                .and_then(|attrs| attrs.get(field))
                .and_then(Value::as_str)
                .map(str::to_owned);
            if from_map.is_some() {
                return from_map;
            }
            if field == "id" {
                return element_id.clone();
            }
            None
        };
        if !self
            .matchers
            .iter()
            .any(|matcher| matcher.matches_element(&tag, &lookup))
        {
            return false;
        }
        if let Some(attrs) = data.get_mut("attributes").and_then(Value::as_object_mut) {
            if let Some(value) = attrs.get_mut("value") {
                mask_string(value);
            }
        }
        if let Some(value) = data.get_mut("value") {
            mask_string(value);
        }
        true
    }

    fn mask_attribute(&self, data: &mut Value) -> bool {
        let name = match data.get("name").and_then(Value::as_str) {
            Some(name) => name.to_owned(),
            None => return false,
        };
        let sensitive = name.eq_ignore_ascii_case("value")
            || self
                .matchers
                .iter()
                .any(|matcher| matcher.matches_attribute_name(&name));
        if !sensitive {
            return false;
        }
        if let Some(value) = data.get_mut("value") {
            mask_string(value);
        }
        true
    }
}

fn mask_string(value: &mut Value) {
    if let Value::String(s) = value {
        if !s.is_empty() {
            *s = MASKED_VALUE.to_owned();
        }
    }
}
