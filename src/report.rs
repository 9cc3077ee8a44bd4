/// Logging of absolute counter values and per-step counter deltas.
use crate::stats::{StatsError, StatsSnapshot};
use serde::Serialize;

/// Column at which values start in report lines.
const LABEL_WIDTH: usize = 26;

/// A counter's value at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterValue {
    pub label: String,
    pub value: i64,
}

/// Change of one counter between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterDelta {
    pub label: String,
    pub before: i64,
    pub after: i64,
    pub delta: i64,
}

impl CounterDelta {
    pub fn between(label: impl Into<String>, before: i64, after: i64) -> Self {
        Self {
            label: label.into(),
            before,
            after,
            delta: after.saturating_sub(before),
        }
    }
}

/// `+` for zero and growth, `-` for shrinkage.
pub fn sign(delta: i64) -> char {
    if delta >= 0 {
        '+'
    } else {
        '-'
    }
}

/// Signed rendering of a delta: `+2`, `+0`, `-2`.
pub fn format_delta(delta: i64) -> String {
    format!("{}{}", sign(delta), delta.unsigned_abs())
}

fn format_line(label: &str, value: impl std::fmt::Display) -> String {
    format!("{:<width$}{value}", format!("{label}:"), width = LABEL_WIDTH)
}

/// Log the absolute value of each tracked counter.
///
/// All lookups happen before anything is logged, so a missing label
/// produces no partial output.
pub fn report_stats(
    snapshot: &StatsSnapshot,
    counters: &[String],
) -> Result<Vec<CounterValue>, StatsError> {
    let values = counters
        .iter()
        .map(|label| {
            Ok(CounterValue {
                label: label.clone(),
                value: snapshot.counter(label)?,
            })
        })
        .collect::<Result<Vec<_>, StatsError>>()?;

    for v in &values {
        tracing::info!("{}", format_line(&v.label, v.value));
    }
    Ok(values)
}

/// Log `after - before` for each tracked counter with an explicit sign.
pub fn report_delta(
    before: &StatsSnapshot,
    after: &StatsSnapshot,
    counters: &[String],
) -> Result<Vec<CounterDelta>, StatsError> {
    let deltas = counters
        .iter()
        .map(|label| {
            Ok(CounterDelta::between(
                label.as_str(),
                before.counter(label)?,
                after.counter(label)?,
            ))
        })
        .collect::<Result<Vec<_>, StatsError>>()?;

    for d in &deltas {
        tracing::info!("{}", format_line(&d.label, format_delta(d.delta)));
    }
    Ok(deltas)
}
