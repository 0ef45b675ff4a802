//! Sampling parameter sub-language: `temperature:[<f>],topp:[<f>]`.

use std::fmt;

/// Temperature used when the analysis stage omits or garbles it.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Top-p used when the analysis stage omits or garbles it.
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Inclusive temperature range the analysis stage is told to respect.
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);

/// Inclusive top-p range the analysis stage is told to respect.
pub const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);

const TEMPERATURE_KEY: &str = "temperature:[";
const TOP_P_KEY: &str = "topp:[";

/// Sampling parameters for the reply stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl SamplingParams {
    /// Decode a `modelparam` tag payload.
    ///
    /// Each field is recovered independently: a missing key, a missing `]`
    /// or a number that does not parse leaves that field at its default.
    /// Parsed values are returned as-is, even outside the advertised ranges.
    pub fn decode(tag: &str) -> Self {
        let defaults = Self::default();
        Self {
            temperature: read_field(tag, TEMPERATURE_KEY).unwrap_or(defaults.temperature),
            top_p: read_field(tag, TOP_P_KEY).unwrap_or(defaults.top_p),
        }
    }

    /// Render as a complete `modelparam` tag.
    pub fn encode(&self) -> String {
        format!(
            "~!modelparam:{{temperature:[{}],topp:[{}]}}!~",
            DecimalDisplay(self.temperature),
            DecimalDisplay(self.top_p)
        )
    }

    /// Whether both values sit inside the ranges given to the analysis stage.
    pub fn is_within_bounds(&self) -> bool {
        in_range(self.temperature, TEMPERATURE_RANGE) && in_range(self.top_p, TOP_P_RANGE)
    }
}

fn in_range(value: f64, (low, high): (f64, f64)) -> bool {
    (low..=high).contains(&value)
}

fn read_field(tag: &str, key: &str) -> Option<f64> {
    let start = tag.find(key)?.saturating_add(key.len());
    let rest = tag.get(start..)?;
    let end = rest.find(']')?;
    let value = rest.get(..end)?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Formats floats with at least one decimal place (`1` -> `1.0`).
pub(crate) struct DecimalDisplay(pub(crate) f64);

impl fmt::Display for DecimalDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.is_finite() {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}
