/// Parsing of the `ccache --show-stats` text report into a snapshot.
///
/// The report is a two-column layout where label and value are separated by
/// runs of spaces, e.g.
///
/// ```text
/// cache hit (direct)                     5
/// cache miss                             2
/// ```
///
/// Each line is split on a double space; the first field is the label and
/// the last field is the value. A line without a double space yields a
/// single field, so its label doubles as its value.
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Token separating the label column from the value column.
pub const FIELD_SEPARATOR: &str = "  ";

/// A single statistic value: integral counters become `Int`, everything
/// else (sizes, percentages, timestamps, headings) stays as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Text(String),
}

impl StatValue {
    /// Coerce a trimmed raw field: all ASCII digits means integer.
    fn from_field(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return StatValue::Int(n);
            }
        }
        StatValue::Text(raw.to_string())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StatValue::Int(n) => Some(*n),
            StatValue::Text(_) => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Int(n) => write!(f, "{n}"),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

/// Errors from looking up a counter in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// The label does not appear in the report.
    MissingKey { label: String },
    /// The label is present but its value is not an integer.
    NotNumeric { label: String, value: String },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::MissingKey { label } => {
                write!(f, "missing key {label:?} in ccache statistics")
            }
            StatsError::NotNumeric { label, value } => {
                write!(f, "ccache statistic {label:?} is not a number: {value:?}")
            }
        }
    }
}

impl std::error::Error for StatsError {}

/// All counters reported by the stats command at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatsSnapshot {
    values: HashMap<String, StatValue>,
}

impl StatsSnapshot {
    /// Parse a raw report. Empty lines are skipped; a whitespace-only line
    /// still goes through the split and lands under the `""` label. A
    /// repeated label keeps the value from its last occurrence.
    pub fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        for line in raw.lines().filter(|l| !l.is_empty()) {
            let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            // split() always yields at least one field
            let label = fields[0].trim();
            let value = fields[fields.len() - 1].trim();
            values.insert(label.to_string(), StatValue::from_field(value));
        }
        Self { values }
    }

    pub fn get(&self, label: &str) -> Option<&StatValue> {
        self.values.get(label)
    }

    /// Integer value of `label`.
    pub fn counter(&self, label: &str) -> Result<i64, StatsError> {
        let value = self.get(label).ok_or_else(|| StatsError::MissingKey {
            label: label.to_string(),
        })?;
        value.as_int().ok_or_else(|| StatsError::NotNumeric {
            label: label.to_string(),
            value: value.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CCACHE_REPORT: &str = "\
cache directory                     /home/dev/.ccache
primary config                      /home/dev/.ccache/ccache.conf
secondary config      (readonly)    /etc/ccache.conf
stats updated                       Sun Oct 18 10:21:33 2026
cache hit (direct)                    12
cache hit (preprocessed)               3
cache miss                            40
cache hit rate                     27.27 %
called for link                        6
cleanups performed                     0
files in cache                       118
cache size                          4.2 MB
max cache size                      5.0 GB
";

    #[test]
    fn test_parse_two_counters() {
        let snapshot = StatsSnapshot::parse("cache hit (direct)  5\ncache miss  2");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("cache hit (direct)"), Some(&StatValue::Int(5)));
        assert_eq!(snapshot.get("cache miss"), Some(&StatValue::Int(2)));
    }

    #[test]
    fn test_parse_real_report() {
        let snapshot = StatsSnapshot::parse(CCACHE_REPORT);
        assert_eq!(snapshot.counter("cache hit (direct)"), Ok(12));
        assert_eq!(snapshot.counter("cache hit (preprocessed)"), Ok(3));
        assert_eq!(snapshot.counter("cache miss"), Ok(40));
        assert_eq!(snapshot.counter("files in cache"), Ok(118));
        assert_eq!(
            snapshot.get("cache hit rate"),
            Some(&StatValue::Text("27.27 %".to_string()))
        );
        assert_eq!(
            snapshot.get("cache directory"),
            Some(&StatValue::Text("/home/dev/.ccache".to_string()))
        );
    }

    #[test]
    fn test_parse_takes_last_field_of_three_columns() {
        let snapshot = StatsSnapshot::parse(CCACHE_REPORT);
        assert_eq!(
            snapshot.get("secondary config"),
            Some(&StatValue::Text("/etc/ccache.conf".to_string()))
        );
    }

    #[test]
    fn test_line_without_separator_maps_label_to_itself() {
        let snapshot = StatsSnapshot::parse("Summary:\ncache miss  1");
        assert_eq!(
            snapshot.get("Summary:"),
            Some(&StatValue::Text("Summary:".to_string()))
        );
        assert_eq!(snapshot.counter("cache miss"), Ok(1));
    }

    #[test]
    fn test_single_space_is_not_a_separator() {
        let snapshot = StatsSnapshot::parse("cache miss 7");
        assert_eq!(snapshot.get("cache miss"), None);
        assert_eq!(
            snapshot.get("cache miss 7"),
            Some(&StatValue::Text("cache miss 7".to_string()))
        );
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let snapshot = StatsSnapshot::parse("\n\ncache miss  1\n\n");
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_whitespace_only_line_maps_to_empty_label() {
        let snapshot = StatsSnapshot::parse("cache miss  1\n   \n");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(""), Some(&StatValue::Text(String::new())));
        assert_eq!(snapshot.counter("cache miss"), Ok(1));
    }

    #[test]
    fn test_duplicate_label_last_wins() {
        let snapshot = StatsSnapshot::parse("cache miss  1\ncache miss  9");
        assert_eq!(snapshot.counter("cache miss"), Ok(9));
    }

    #[test]
    fn test_crlf_line_endings() {
        let snapshot = StatsSnapshot::parse("cache hit (direct)  5\r\ncache miss  2\r\n");
        assert_eq!(snapshot.counter("cache hit (direct)"), Ok(5));
        assert_eq!(snapshot.counter("cache miss"), Ok(2));
    }

    #[test]
    fn test_signed_or_fractional_values_stay_text() {
        let snapshot = StatsSnapshot::parse("a  -3\nb  1.5\nc  +4");
        assert_eq!(snapshot.get("a"), Some(&StatValue::Text("-3".to_string())));
        assert_eq!(snapshot.get("b"), Some(&StatValue::Text("1.5".to_string())));
        assert_eq!(snapshot.get("c"), Some(&StatValue::Text("+4".to_string())));
    }

    #[test]
    fn test_overflowing_digits_stay_text() {
        let snapshot = StatsSnapshot::parse("huge  99999999999999999999999");
        assert_eq!(snapshot.get("huge").and_then(StatValue::as_int), None);
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(
            StatsSnapshot::parse(CCACHE_REPORT),
            StatsSnapshot::parse(CCACHE_REPORT)
        );
    }

    #[test]
    fn test_counter_missing_key() {
        let snapshot = StatsSnapshot::parse("cache miss  2");
        let err = snapshot.counter("cache hit (direct)").unwrap_err();
        assert_eq!(
            err,
            StatsError::MissingKey {
                label: "cache hit (direct)".to_string()
            }
        );
        assert!(err.to_string().contains("missing key"));
    }

    #[test]
    fn test_counter_not_numeric() {
        let snapshot = StatsSnapshot::parse("cache hit rate  27.27 %");
        assert!(matches!(
            snapshot.counter("cache hit rate"),
            Err(StatsError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_empty_report() {
        let snapshot = StatsSnapshot::parse("");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_values_untagged() {
        let snapshot = StatsSnapshot::parse("cache miss  2\ncache size  4.2 MB");
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["cache miss"], 2);
        assert_eq!(json["cache size"], "4.2 MB");
    }
}
