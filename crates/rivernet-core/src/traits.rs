use std::collections::BTreeMap;

use crate::error::{ParameterError, SimulationError};
use crate::forcing::ClimateSample;

/// Calibratable parameter set of a node model.
///
/// Names, bounds and defaults are declared once per model; construction from
/// a flat vector validates both length and bounds.
pub trait ModelParams: Sized + Copy {
    /// Model name used in error messages.
    const MODEL: &'static str;
    const PARAM_NAMES: &'static [&'static str];
    /// Bounds as (min, max) tuples, in `PARAM_NAMES` order.
    const PARAM_BOUNDS: &'static [(f64, f64)];
    const DEFAULTS: &'static [f64];

    /// Build from an already validated slice.
    fn from_array_unchecked(arr: &[f64]) -> Self;

    fn to_array(&self) -> Vec<f64>;

    /// Build from a slice, rejecting wrong lengths and out-of-bounds values.
    fn from_array(arr: &[f64]) -> Result<Self, ParameterError> {
        if arr.len() != Self::PARAM_NAMES.len() {
            return Err(ParameterError::WrongLength {
                model: Self::MODEL,
                expected: Self::PARAM_NAMES.len(),
                got: arr.len(),
            });
        }
        for ((&name, &(min, max)), &value) in Self::PARAM_NAMES
            .iter()
            .zip(Self::PARAM_BOUNDS)
            .zip(arr)
        {
            // NaN fails the range check too
            if !(min..=max).contains(&value) {
                return Err(ParameterError::OutOfBounds {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(Self::from_array_unchecked(arr))
    }

    /// Defaults overridden by any named values.
    fn from_named(values: &BTreeMap<String, f64>) -> Result<Self, ParameterError> {
        let mut arr = Self::DEFAULTS.to_vec();
        for (name, &value) in values {
            let idx = Self::PARAM_NAMES
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| ParameterError::UnknownParameter {
                    model: Self::MODEL,
                    name: name.clone(),
                })?;
            arr[idx] = value;
        }
        Self::from_array(&arr)
    }

    fn defaults() -> Self {
        Self::from_array_unchecked(Self::DEFAULTS)
    }
}

/// Parameter metadata handed to an optimizer: starting point and search range.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBounds {
    pub names: &'static [&'static str],
    pub defaults: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl ParameterBounds {
    pub fn of<P: ModelParams>() -> Self {
        Self {
            names: P::PARAM_NAMES,
            defaults: P::DEFAULTS.to_vec(),
            lower: P::PARAM_BOUNDS.iter().map(|b| b.0).collect(),
            upper: P::PARAM_BOUNDS.iter().map(|b| b.1).collect(),
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// (min, max) pairs in parameter order.
    pub fn ranges(&self) -> Vec<(f64, f64)> {
        self.lower.iter().copied().zip(self.upper.iter().copied()).collect()
    }
}

/// Capability set shared by every node model in a network.
///
/// A node owns its parameters, its dynamic state and the history of
/// everything it has emitted. `step` advances exactly one timestep and
/// `reset` restores the state captured when the node was built.
pub trait NodeModel {
    /// Node name, unique within a network.
    fn name(&self) -> &str;

    /// Advance one timestep and return the outflow [ML/timestep].
    ///
    /// State is only committed when every computed quantity is finite.
    fn step(
        &mut self,
        forcing: &ClimateSample,
        inflow: f64,
        extraction: f64,
        exchange: f64,
    ) -> Result<f64, SimulationError>;

    /// Replace the parameter vector. Dynamic state is left untouched.
    ///
    /// Models with a stream-level rating also accept the flow parameters
    /// followed by the rating parameters.
    fn update_parameters(&mut self, values: &[f64]) -> Result<(), ParameterError>;

    /// Restore the initial state and clear the history. Parameters persist.
    fn reset(&mut self);

    fn parameter_bounds(&self) -> ParameterBounds;

    fn current_parameters(&self) -> Vec<f64>;

    /// Flow parameters followed by any stream-level rating parameters.
    fn parameter_bounds_with_level(&self) -> ParameterBounds {
        self.parameter_bounds()
    }

    fn current_parameters_with_level(&self) -> Vec<f64> {
        self.current_parameters()
    }

    /// Number of timesteps evaluated since the last reset.
    fn timesteps_completed(&self) -> usize;

    /// Outflow history [ML/timestep].
    fn outflow(&self) -> &[f64];

    /// History of a named output variable (e.g. `level`).
    fn output(&self, variable: &str) -> Option<&[f64]>;
}
