/// Monotonic relations from stored volume to level or surface area.
use serde::Deserialize;

use crate::error::ConfigurationError;

/// A non-decreasing function of stored volume [ML].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageRelation {
    /// `offset + coefficient * volume^exponent`
    Power {
        #[serde(default)]
        offset: f64,
        coefficient: f64,
        exponent: f64,
    },
    /// Piecewise-linear lookup; held flat beyond the first and last point.
    Table { volumes: Vec<f64>, values: Vec<f64> },
}

impl StorageRelation {
    /// Value of the relation at `volume`. Negative volumes are treated as empty.
    pub fn evaluate(&self, volume: f64) -> f64 {
        let volume = volume.max(0.0);
        match self {
            Self::Power {
                offset,
                coefficient,
                exponent,
            } => offset + coefficient * volume.powf(*exponent),
            Self::Table { volumes, values } => interpolate(volumes, values, volume),
        }
    }

    /// Check the relation is well formed and non-decreasing.
    pub fn validate(&self, node: &str) -> Result<(), ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidStorageRelation {
            node: node.to_string(),
            reason: reason.to_string(),
        };
        match self {
            Self::Power {
                offset,
                coefficient,
                exponent,
            } => {
                if !(offset.is_finite() && coefficient.is_finite() && exponent.is_finite()) {
                    return Err(invalid("power relation terms must be finite"));
                }
                if *coefficient < 0.0 || *exponent <= 0.0 {
                    return Err(invalid("power relation must have coefficient >= 0 and exponent > 0"));
                }
            }
            Self::Table { volumes, values } => {
                if volumes.len() < 2 || volumes.len() != values.len() {
                    return Err(invalid("table needs at least two (volume, value) pairs"));
                }
                if volumes.iter().chain(values).any(|v| !v.is_finite()) {
                    return Err(invalid("table entries must be finite"));
                }
                if volumes.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(invalid("table volumes must be strictly increasing"));
                }
                if values.windows(2).any(|w| w[1] < w[0]) {
                    return Err(invalid("table values must not decrease"));
                }
            }
        }
        Ok(())
    }
}

fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    let last = xs.len() - 1;
    if x >= xs[last] {
        return ys[last];
    }
    let i = xs.partition_point(|v| *v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
