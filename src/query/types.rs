//! Shared value types for query trees

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator for combining terms in a match query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    /// All terms must match (AND)
    And,
    /// At least one term must match (OR)
    #[default]
    Or,
}

/// Value type for range queries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeValue {
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// String (for dates, keywords)
    String(String),
}

impl RangeValue {
    /// Convert to f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RangeValue::Long(v) => Some(*v as f64),
            RangeValue::Double(v) => Some(*v),
            RangeValue::String(s) => s.parse().ok(),
        }
    }
}

/// Range bounds for range queries
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Greater than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<RangeValue>,
    /// Greater than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<RangeValue>,
    /// Less than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<RangeValue>,
    /// Less than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<RangeValue>,
}

impl RangeBounds {
    /// Check if a float value is within this range
    pub fn contains_f64(&self, value: f64) -> bool {
        if let Some(ref gte) = self.gte {
            if let Some(bound) = gte.as_f64() {
                if value < bound {
                    return false;
                }
            }
        }
        if let Some(ref gt) = self.gt {
            if let Some(bound) = gt.as_f64() {
                if value <= bound {
                    return false;
                }
            }
        }
        if let Some(ref lte) = self.lte {
            if let Some(bound) = lte.as_f64() {
                if value > bound {
                    return false;
                }
            }
        }
        if let Some(ref lt) = self.lt {
            if let Some(bound) = lt.as_f64() {
                if value >= bound {
                    return false;
                }
            }
        }
        true
    }

    /// Check if an indexed term falls within this range
    ///
    /// Terms that parse as numbers compare numerically, anything else
    /// compares lexicographically against the string form of the bounds.
    pub fn contains_term(&self, term: &str) -> bool {
        if let Ok(value) = term.parse::<f64>() {
            return self.contains_f64(value);
        }
        let term = term.to_string();
        let check = |bound: &Option<RangeValue>, ok: fn(&String, &String) -> bool| match bound {
            Some(RangeValue::String(b)) => ok(&term, b),
            Some(_) => false,
            None => true,
        };
        check(&self.gte, |t, b| t >= b)
            && check(&self.gt, |t, b| t > b)
            && check(&self.lte, |t, b| t <= b)
            && check(&self.lt, |t, b| t < b)
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeValue::Long(v) => write!(f, "{}", v),
            RangeValue::Double(v) => write!(f, "{}", v),
            RangeValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for RangeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, lower) = match (&self.gte, &self.gt) {
            (Some(v), _) => ('[', v.to_string()),
            (None, Some(v)) => ('{', v.to_string()),
            (None, None) => ('[', "*".to_string()),
        };
        let (close, upper) = match (&self.lte, &self.lt) {
            (Some(v), _) => (']', v.to_string()),
            (None, Some(v)) => ('}', v.to_string()),
            (None, None) => (']', "*".to_string()),
        };
        write!(f, "{}{} TO {}{}", open, lower, upper, close)
    }
}

/// Minimum should match configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinimumShouldMatch {
    /// Exact count
    Count(usize),
    /// Percentage (e.g., "75%")
    Percentage(String),
}

impl MinimumShouldMatch {
    /// Calculate the minimum number of clauses that should match
    pub fn calculate(&self, total_clauses: usize) -> usize {
        match self {
            MinimumShouldMatch::Count(n) => *n,
            MinimumShouldMatch::Percentage(s) => {
                let pct: f64 = s
                    .trim_end_matches('%')
                    .parse()
                    .unwrap_or(100.0)
                    / 100.0;
                ((total_clauses as f64) * pct).ceil() as usize
            }
        }
    }
}

impl Default for MinimumShouldMatch {
    fn default() -> Self {
        MinimumShouldMatch::Count(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_value_conversions() {
        let long = RangeValue::Long(42);
        assert_eq!(long.as_f64(), Some(42.0));

        let double = RangeValue::Double(3.5);
        assert_eq!(double.as_f64(), Some(3.5));

        let string = RangeValue::String("100".to_string());
        assert_eq!(string.as_f64(), Some(100.0));
        assert_eq!(RangeValue::String("abc".to_string()).as_f64(), None);
    }

    #[test]
    fn test_range_bounds() {
        let bounds = RangeBounds {
            gte: Some(RangeValue::Long(10)),
            lt: Some(RangeValue::Long(20)),
            ..Default::default()
        };

        assert!(bounds.contains_f64(10.0));
        assert!(bounds.contains_f64(15.0));
        assert!(!bounds.contains_f64(20.0));
        assert!(!bounds.contains_f64(9.5));
    }

    #[test]
    fn test_range_contains_term() {
        let numeric = RangeBounds {
            gte: Some(RangeValue::Long(10)),
            lte: Some(RangeValue::Long(20)),
            ..Default::default()
        };
        assert!(numeric.contains_term("15"));
        assert!(!numeric.contains_term("25"));
        assert!(!numeric.contains_term("banana"));

        let textual = RangeBounds {
            gte: Some(RangeValue::String("apple".to_string())),
            lt: Some(RangeValue::String("cherry".to_string())),
            ..Default::default()
        };
        assert!(textual.contains_term("banana"));
        assert!(!textual.contains_term("date"));
    }

    #[test]
    fn test_range_display() {
        let bounds = RangeBounds {
            gte: Some(RangeValue::Long(1)),
            lt: Some(RangeValue::Long(5)),
            ..Default::default()
        };
        assert_eq!(bounds.to_string(), "[1 TO 5}");
        assert_eq!(RangeBounds::default().to_string(), "[* TO *]");
    }

    #[test]
    fn test_minimum_should_match() {
        assert_eq!(MinimumShouldMatch::Count(2).calculate(5), 2);
        assert_eq!(
            MinimumShouldMatch::Percentage("75%".to_string()).calculate(4),
            3
        );
    }
}
