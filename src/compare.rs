//! Adaptive-precision comparison of reference and simulated series.
//!
//! Reference fixtures and simulator output are written by different
//! producers and often disagree on how many decimals to print. Two samples
//! match if they are numerically equal, or equal once both are rounded to
//! the smaller of their two decimal precisions. A value printed without a
//! fractional part is held to strict equality.

#![allow(clippy::float_cmp)]

use std::fmt;

use tracing::debug;

use crate::reporter::Reporter;
use crate::series::SeriesTable;

/// One disagreeing sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Values differ after adaptive rounding, or one does not parse.
    Value {
        series: String,
        reference: String,
        simulated: String,
    },
    /// The simulated table has no series (or no value at this step) for a
    /// reference series.
    Missing { series: String },
}

impl Mismatch {
    pub fn series(&self) -> &str {
        match self {
            Self::Value { series, .. } | Self::Missing { series } => series,
        }
    }
}

/// Result of walking two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Every sample agreed.
    Match { steps: usize },
    /// The walk stopped at `step`; `mismatches` lists every disagreement
    /// found at that step, in reference header order.
    Mismatch {
        step: String,
        index: usize,
        mismatches: Vec<Mismatch>,
    },
}

impl Comparison {
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Diagnostic line for one mismatch at a time step.
#[derive(Debug)]
pub struct MismatchLine<'a> {
    pub step: &'a str,
    pub mismatch: &'a Mismatch,
}

impl fmt::Display for MismatchLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mismatch {
            Mismatch::Value {
                series,
                reference,
                simulated,
            } => write!(
                f,
                "time {} mismatch in {series} ({reference} != {simulated})",
                self.step
            ),
            Mismatch::Missing { series } => {
                write!(f, "time {} missing series {series} in simulated output", self.step)
            }
        }
    }
}

/// Decimal places a sample is written to, or `None` when there is no point
/// or the text carries no fractional precision (`"5"`, `"5."`, `"1.5e3"`).
///
/// An exponent shifts the mantissa digits: `"1.5e-3"` has 4 places.
fn decimal_places(text: &str) -> Option<usize> {
    let (_, frac) = text.trim().split_once('.')?;
    let digits = frac.bytes().take_while(u8::is_ascii_digit).count();
    let exponent = match frac[digits..].strip_prefix(['e', 'E']) {
        Some(exp) => exp.parse::<i64>().ok()?,
        None => 0,
    };
    let places = i64::try_from(digits).ok()?.checked_sub(exponent)?;
    usize::try_from(places).ok().filter(|&p| p > 0)
}

/// 2^53: every float at or above this magnitude is already an integer.
const EXACT_INTEGERS: f64 = 9_007_199_254_740_992.0;

/// Rounds `value` to `decimals` places, ties away from zero.
///
/// Values already exact at that scale come back unchanged.
fn round_to(value: f64, decimals: usize) -> f64 {
    let Ok(exp) = i32::try_from(decimals) else {
        return value;
    };
    let scale = 10f64.powi(exp);
    let scaled = value * scale;
    if !scaled.is_finite() || scaled.abs() >= EXACT_INTEGERS {
        return value;
    }
    scaled.round() / scale
}

/// Whether two raw sample texts agree under the adaptive-precision rule.
pub fn values_match(reference: &str, simulated: &str) -> bool {
    let (Ok(r), Ok(s)) = (
        reference.trim().parse::<f64>(),
        simulated.trim().parse::<f64>(),
    ) else {
        return false;
    };

    if r == s {
        return true;
    }

    match (decimal_places(reference), decimal_places(simulated)) {
        (Some(rd), Some(sd)) => {
            let decimals = rd.min(sd);
            round_to(r, decimals) == round_to(s, decimals)
        }
        _ => false,
    }
}

/// Walks both tables by time index and stops after the first step with a
/// mismatch, logging each mismatch at that step as an error.
pub fn compare(
    reference: &SeriesTable,
    simulated: &SeriesTable,
    reporter: &mut Reporter,
) -> Comparison {
    let time = reference.time();

    for (index, step) in time.iter().enumerate() {
        let mut mismatches = Vec::new();

        for (name, values) in reference.data_series() {
            let Some(ref_value) = values.get(index) else {
                continue;
            };
            let sim_value = simulated
                .lookup(name)
                .and_then(|series| series.get(index));

            let mismatch = match sim_value {
                None => Mismatch::Missing {
                    series: name.to_string(),
                },
                Some(sim_value) if !values_match(ref_value, sim_value) => Mismatch::Value {
                    series: name.to_string(),
                    reference: ref_value.clone(),
                    simulated: sim_value.clone(),
                },
                Some(_) => continue,
            };

            reporter.error(MismatchLine {
                step,
                mismatch: &mismatch,
            });
            mismatches.push(mismatch);
        }

        if !mismatches.is_empty() {
            debug!(step = %step, index, count = mismatches.len(), "comparison stopped");
            return Comparison::Mismatch {
                step: step.clone(),
                index,
                mismatches,
            };
        }
    }

    Comparison::Match { steps: time.len() }
}
