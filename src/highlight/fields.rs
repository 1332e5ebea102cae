use regex::Regex;

use crate::query::pattern::wildcard_to_regex;
use crate::Result;

/// A requested field name, possibly with wildcards
#[derive(Clone, Debug)]
pub enum FieldPattern {
    /// `*`: every stored field
    All,
    Exact(String),
    /// `title_*`, `*_txt`, `t?tle`
    Wildcard(Regex),
}

impl FieldPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern == "*" {
            Ok(FieldPattern::All)
        } else if pattern.contains(['*', '?']) {
            Ok(FieldPattern::Wildcard(wildcard_to_regex(pattern)?))
        } else {
            Ok(FieldPattern::Exact(pattern.to_string()))
        }
    }

    pub fn matches(&self, field: &str) -> bool {
        match self {
            FieldPattern::All => true,
            FieldPattern::Exact(name) => name == field,
            FieldPattern::Wildcard(regex) => regex.is_match(field),
        }
    }
}

/// Split a field list on whitespace and commas
pub fn parse_field_list(list: &str) -> Vec<String> {
    list.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
