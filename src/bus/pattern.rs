//! Declarative message patterns.
//!
//! A [`Pattern`] maps field names to a [`Directive`]. A message matches when
//! every directive is satisfied; the empty pattern matches everything.
//!
//! A field counts as absent when the key is missing or its value is `null`.
//! Falsy values such as `0`, `""` or `false` are present.
//!
//! ```
//! use rediservice::bus::Pattern;
//! use serde_json::json;
//!
//! let pattern = Pattern::new().present("words").absent("result");
//! let message = json!({ "words": ["hello"], "sep": "" });
//! assert!(pattern.matches(message.as_object().unwrap()));
//! ```

use serde_json::{Map, Value};

use super::error::BusError;

/// What a pattern requires of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// The field must be present and not `null`.
    Present,
    /// The field must be missing or `null`.
    Absent,
    /// The field must be present and equal to this value.
    EqualTo(Value),
}

impl Directive {
    /// Check this directive against a field's value (`None` when the key is missing).
    pub fn is_satisfied_by(&self, value: Option<&Value>) -> bool {
        let value = value.filter(|v| !v.is_null());
        match self {
            Directive::Present => value.is_some(),
            Directive::Absent => value.is_none(),
            Directive::EqualTo(expected) => value == Some(expected),
        }
    }
}

/// Conjunction of per-field directives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    fields: Vec<(String, Directive)>,
}

impl Pattern {
    /// The empty pattern, which matches every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for [`Pattern::new`] that reads better at call sites.
    pub fn any() -> Self {
        Self::default()
    }

    /// Require `field` to be present.
    pub fn present(self, field: impl Into<String>) -> Self {
        self.with(field, Directive::Present)
    }

    /// Require `field` to be absent.
    pub fn absent(self, field: impl Into<String>) -> Self {
        self.with(field, Directive::Absent)
    }

    /// Require `field` to equal `value`.
    pub fn equal_to(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Directive::EqualTo(value.into()))
    }

    /// Set the directive for `field`, replacing any earlier one.
    pub fn with(mut self, field: impl Into<String>, directive: Directive) -> Self {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = directive,
            None => self.fields.push((field, directive)),
        }
        self
    }

    /// Directive for `field`, if any.
    pub fn directive(&self, field: &str) -> Option<&Directive> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, directive)| directive)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Evaluate the pattern against a message. Pure; never fails.
    pub fn matches(&self, message: &Map<String, Value>) -> bool {
        self.fields
            .iter()
            .all(|(field, directive)| directive.is_satisfied_by(message.get(field)))
    }
}

impl<K: Into<String>> FromIterator<(K, Directive)> for Pattern {
    fn from_iter<I: IntoIterator<Item = (K, Directive)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Pattern::new(), |pattern, (field, directive)| pattern.with(field, directive))
    }
}

/// Read a pattern written as a JSON object: `true` means present, `false`
/// means absent, and anything else must be equal.
impl TryFrom<&Value> for Pattern {
    type Error = BusError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let Some(fields) = value.as_object() else {
            return Err(BusError::not_a_mapping("match", value));
        };

        Ok(fields
            .iter()
            .map(|(field, directive)| {
                let directive = match directive {
                    Value::Bool(true) => Directive::Present,
                    Value::Bool(false) => Directive::Absent,
                    other => Directive::EqualTo(other.clone()),
                };
                (field.clone(), directive)
            })
            .collect())
    }
}

impl TryFrom<Value> for Pattern {
    type Error = BusError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Pattern::try_from(&value)
    }
}
