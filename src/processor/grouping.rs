//! Group key computation.
//!
//! Metrics are bucketed by measurement name and their timestamp truncated to
//! whole seconds. Configured glob patterns decide which measurement names are
//! eligible for keying at all.

use crate::core::{CycleStatsError, Metric, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;

/// Identity of a group of same-instant metrics
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    name: String,
    second: i64,
}

impl GroupKey {
    /// Measurement name part of the key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unix second the key was truncated to
    pub fn second(&self) -> i64 {
        self.second
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.second)
    }
}

/// Computes the group key for a measurement name and timestamp.
///
/// `timestamp()` floors toward negative infinity, so sub-second offsets of
/// pre-epoch timestamps land in the same bucket too.
#[inline]
pub fn group_key(name: &str, timestamp: DateTime<Utc>) -> GroupKey {
    GroupKey {
        name: name.to_string(),
        second: timestamp.timestamp(),
    }
}

/// Glob matcher deciding which measurements can be keyed
#[derive(Debug, Clone)]
pub struct GroupKeyer {
    patterns: Vec<Regex>,
}

impl GroupKeyer {
    /// Compile the configured glob patterns.
    ///
    /// Patterns that fail to compile are logged and skipped. If none compile
    /// the keyer cannot be built.
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(globs.len());
        let mut last_error = None;

        for glob in globs {
            match compile_glob(glob.as_ref()) {
                Ok(re) => patterns.push(re),
                Err(e) => {
                    tracing::warn!("Skipping grouping pattern: {}", e);
                    last_error = Some(e);
                },
            }
        }

        if patterns.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| CycleStatsError::config("no grouping patterns configured")));
        }

        Ok(Self { patterns })
    }

    /// Returns true if the measurement name matches any pattern
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }

    /// Key a metric, failing if its name matches no pattern
    pub fn key(&self, metric: &Metric) -> Result<GroupKey> {
        if !self.matches(metric.name()) {
            return Err(CycleStatsError::UnmatchedMeasurement(metric.name().to_string()));
        }
        Ok(group_key(metric.name(), metric.time()))
    }
}

/// Translate a glob (`*`, `?`, `[...]`, `\` escapes) into an anchored regex
fn compile_glob(glob: &str) -> Result<Regex> {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');

    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                re.push('[');
                let mut closed = false;
                let mut first = true;
                for c in chars.by_ref() {
                    match c {
                        ']' if !first => {
                            closed = true;
                            break;
                        },
                        '!' if first => re.push('^'),
                        '\\' => re.push_str("\\\\"),
                        _ => re.push(c),
                    }
                    first = false;
                }
                if !closed {
                    return Err(CycleStatsError::Pattern {
                        pattern: glob.to_string(),
                        reason: "unclosed character class".to_string(),
                    });
                }
                re.push(']');
            },
            '\\' => {
                let Some(escaped) = chars.next() else {
                    return Err(CycleStatsError::Pattern {
                        pattern: glob.to_string(),
                        reason: "dangling escape".to_string(),
                    });
                };
                re.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
            },
            _ => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| CycleStatsError::Pattern {
        pattern: glob.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn test_same_second_same_key() {
        let a = group_key("steam_params", at(1_700_000_000, 0));
        let b = group_key("steam_params", at(1_700_000_000, 999_999_999));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "steam_params@1700000000");
    }

    #[test]
    fn test_next_second_new_key() {
        let a = group_key("steam_params", at(1_700_000_000, 999_999_999));
        let b = group_key("steam_params", at(1_700_000_001, 0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_names_never_collide() {
        let a = group_key("steam", at(5, 0));
        let b = group_key("grinder", at(5, 0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_pre_epoch_truncation() {
        let a = group_key("steam", at(-2, 100));
        let b = group_key("steam", at(-2, 900_000_000));
        assert_eq!(a, b);
        assert_eq!(a.second(), -2);
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let keyer = GroupKeyer::new(&["*"]).unwrap();
        assert!(keyer.matches("steam_params"));
        assert!(keyer.matches(""));
    }

    #[test]
    fn test_glob_patterns() {
        let keyer = GroupKeyer::new(&["steam_*", "vessel_?tatus", "grind[e]r"]).unwrap();
        assert!(keyer.matches("steam_stats"));
        assert!(keyer.matches("vessel_status"));
        assert!(keyer.matches("grinder"));
        assert!(!keyer.matches("system_status"));
        assert!(!keyer.matches("steam"));
    }

    #[test]
    fn test_literal_dot_is_escaped() {
        let keyer = GroupKeyer::new(&["a.b"]).unwrap();
        assert!(keyer.matches("a.b"));
        assert!(!keyer.matches("axb"));
    }

    #[test]
    fn test_backslash_escapes_metacharacters() {
        let keyer = GroupKeyer::new(&[r"steam\*", r"grind\?r"]).unwrap();
        assert!(keyer.matches("steam*"));
        assert!(!keyer.matches("steam_stats"));
        assert!(keyer.matches("grind?r"));
        assert!(!keyer.matches("grinder"));
        assert!(GroupKeyer::new(&[r"steam\"]).is_err());
    }

    #[test]
    fn test_bad_patterns_skipped() {
        let keyer = GroupKeyer::new(&["[steam", "grinder"]).unwrap();
        assert!(keyer.matches("grinder"));
    }

    #[test]
    fn test_no_compilable_pattern_is_fatal() {
        let err = GroupKeyer::new(&["[steam"]).unwrap_err();
        assert_eq!(err.category(), "config");
        assert!(GroupKeyer::new::<&str>(&[]).is_err());
    }

    #[test]
    fn test_unmatched_metric_key_error() {
        let keyer = GroupKeyer::new(&["steam*"]).unwrap();
        let metric = Metric::new("grinder", at(1, 0));
        assert!(matches!(
            keyer.key(&metric),
            Err(CycleStatsError::UnmatchedMeasurement(name)) if name == "grinder"
        ));
    }
}
