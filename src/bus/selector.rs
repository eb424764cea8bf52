//! Service selection by exact name or regular expression.

use regex::Regex;

/// Chooses which registered services an operation applies to.
#[derive(Debug, Clone, Default)]
pub enum Selector {
    /// Every service.
    #[default]
    All,
    /// The service with exactly this name.
    Exact(String),
    /// Every service whose name the expression matches anywhere.
    Pattern(Regex),
}

impl Selector {
    /// Build a [`Selector::Pattern`] from a regular expression.
    pub fn pattern(expression: &str) -> Result<Self, regex::Error> {
        Ok(Selector::Pattern(Regex::new(expression)?))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Exact(exact) => exact == name,
            Selector::Pattern(regex) => regex.is_match(name),
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Exact(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Exact(name)
    }
}

impl From<Regex> for Selector {
    fn from(regex: Regex) -> Self {
        Selector::Pattern(regex)
    }
}

impl<T: Into<Selector>> From<Option<T>> for Selector {
    fn from(selector: Option<T>) -> Self {
        selector.map_or(Selector::All, Into::into)
    }
}
