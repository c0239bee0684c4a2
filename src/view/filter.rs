//! Filter rules and row acceptance.
//!
//! A row passes when it matches the global filter text (if any) and every rule
//! in order. Text comparisons ignore case. Regex rules are compiled once per
//! refresh with the ripgrep matcher; a pattern that does not compile matches
//! nothing.

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use serde::{Deserialize, Serialize};

/// How a rule compares its value against a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    #[serde(rename = "Contains")]
    Contains,
    #[serde(rename = "Not contains")]
    NotContains,
    #[serde(rename = "Equals")]
    Equals,
    #[serde(rename = "Starts with")]
    StartsWith,
    #[serde(rename = "Ends with")]
    EndsWith,
    #[serde(rename = "Regex")]
    Regex,
}

impl MatchMode {
    pub const ALL: [MatchMode; 6] = [
        MatchMode::Contains,
        MatchMode::NotContains,
        MatchMode::Equals,
        MatchMode::StartsWith,
        MatchMode::EndsWith,
        MatchMode::Regex,
    ];

    /// Label used in persisted templates and on the command line
    pub fn label(self) -> &'static str {
        match self {
            Self::Contains => "Contains",
            Self::NotContains => "Not contains",
            Self::Equals => "Equals",
            Self::StartsWith => "Starts with",
            Self::EndsWith => "Ends with",
            Self::Regex => "Regex",
        }
    }

    /// Parse a label, ignoring case, spaces, dashes and underscores
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted: String = label
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL.into_iter().find(|mode| {
            let name: String = mode
                .label()
                .chars()
                .filter(|c| *c != ' ')
                .flat_map(char::to_lowercase)
                .collect();
            name == wanted
        })
    }
}

/// One predicate of the filter chain.
///
/// `column: None` targets all columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub column: Option<usize>,
    pub mode: MatchMode,
    pub value: String,
}

impl FilterRule {
    pub fn new(column: Option<usize>, mode: MatchMode, value: impl Into<String>) -> Self {
        Self {
            column,
            mode,
            value: value.into(),
        }
    }

    /// Rule against a single data column
    pub fn column(column: usize, mode: MatchMode, value: impl Into<String>) -> Self {
        Self::new(Some(column), mode, value)
    }

    /// Rule against every data column
    pub fn all_columns(mode: MatchMode, value: impl Into<String>) -> Self {
        Self::new(None, mode, value)
    }
}

/// Named, persistable filter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTemplate {
    pub name: String,
    #[serde(default)]
    pub global: String,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
}

/// A rule prepared for repeated evaluation
#[derive(Debug, Clone)]
struct CompiledRule {
    column: Option<usize>,
    mode: MatchMode,
    needle: String,
    matcher: Option<RegexMatcher>,
}

impl CompiledRule {
    fn compile(rule: &FilterRule) -> Self {
        let matcher = match rule.mode {
            MatchMode::Regex => match RegexMatcherBuilder::new()
                .case_insensitive(true)
                .build(&rule.value)
            {
                Ok(matcher) => Some(matcher),
                Err(err) => {
                    log::warn!("filter regex '{}' rejected: {}", rule.value, err);
                    None
                }
            },
            _ => None,
        };
        Self {
            column: rule.column,
            mode: rule.mode,
            needle: rule.value.to_lowercase(),
            matcher,
        }
    }

    fn accepts(&self, row: &[String]) -> bool {
        match self.column {
            Some(column) => row
                .get(column)
                .map_or(false, |value| self.matches_value(value)),
            // Not-contains over all columns means no column may contain the value.
            None if self.mode == MatchMode::NotContains => row
                .iter()
                .all(|value| !value.to_lowercase().contains(&self.needle)),
            None => row.iter().any(|value| self.matches_value(value)),
        }
    }

    fn matches_value(&self, value: &str) -> bool {
        if self.mode == MatchMode::Regex {
            return self
                .matcher
                .as_ref()
                .map_or(false, |matcher| {
                    matcher.is_match(value.as_bytes()).unwrap_or(false)
                });
        }

        let haystack = value.to_lowercase();
        match self.mode {
            MatchMode::Contains => haystack.contains(&self.needle),
            MatchMode::NotContains => !haystack.contains(&self.needle),
            MatchMode::Equals => haystack == self.needle,
            MatchMode::StartsWith => haystack.starts_with(&self.needle),
            MatchMode::EndsWith => haystack.ends_with(&self.needle),
            MatchMode::Regex => false,
        }
    }
}

/// Global filter text plus compiled rules, evaluated against raw rows
#[derive(Debug, Clone)]
pub struct RowFilter {
    global: String,
    rules: Vec<CompiledRule>,
}

impl RowFilter {
    pub fn new(global: &str, rules: &[FilterRule]) -> Self {
        Self {
            global: global.trim().to_lowercase(),
            rules: rules.iter().map(CompiledRule::compile).collect(),
        }
    }

    /// True when the filter lets every row of a non-empty table through
    pub fn is_pass_through(&self) -> bool {
        self.global.is_empty() && self.rules.is_empty()
    }

    /// Row acceptance: global text first, then every rule in order.
    pub fn accepts(&self, row: &[String]) -> bool {
        if row.is_empty() {
            return false;
        }
        if !self.global.is_empty()
            && !row
                .iter()
                .any(|value| value.to_lowercase().contains(&self.global))
        {
            return false;
        }
        self.rules.iter().all(|rule| rule.accepts(row))
    }
}
