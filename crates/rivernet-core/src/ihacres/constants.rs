/// IHACRES numerical constants and parameter contract.

// -- Numerical safeguards --

/// Smallest time constant accepted by the recession and drying rules [timesteps].
pub const MIN_TIME_CONSTANT: f64 = 1e-3;

/// Reference temperature for the temperature-driven drying rule [°C].
pub const REFERENCE_TEMPERATURE: f64 = 20.0;

/// Evapotranspiration stand-in per degree above zero under temperature forcing [mm/°C].
pub const ET_PER_DEGREE: f64 = 0.1;

// -- Model contract constants --

pub const MODEL_NAME: &str = "IHACRES";

/// Parameter names in order.
pub const PARAM_NAMES: &[&str] = &["d", "f", "e", "c", "alpha", "tau_q", "tau_s"];

/// Number of parameters.
pub const N_PARAMS: usize = 7;

/// Number of elements in the state vector.
pub const STATE_SIZE: usize = 3;

// -- Parameter bounds --

/// Parameter bounds as (min, max) tuples, in PARAM_NAMES order.
pub const PARAM_BOUNDS: &[(f64, f64)] = &[
    (1.0, 200.0),  // d: drying time constant at zero ET [timesteps]
    (0.0, 1.0),    // f: drying sensitivity [1/mm or 1/°C]
    (0.1, 1.5),    // e: share of ET withdrawn from the wetness index [-]
    (1e-5, 0.05),  // c: effective rainfall coefficient [1/mm]
    (0.0, 1.0),    // alpha: quick-flow share of effective rainfall [-]
    (0.5, 20.0),   // tau_q: quick store time constant [timesteps]
    (10.0, 500.0), // tau_s: slow store time constant [timesteps]
];

/// Default parameter values, in PARAM_NAMES order.
pub const DEFAULTS: &[f64] = &[30.0, 0.1, 1.0, 0.002, 0.7, 2.0, 60.0];

// -- Stream level rating --

/// Rating-curve parameter names, in order.
pub const LEVEL_PARAM_NAMES: &[&str] = &["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "ctf"];

pub const N_LEVEL_PARAMS: usize = 9;

/// Rating-curve bounds as (min, max) tuples, in LEVEL_PARAM_NAMES order.
pub const LEVEL_PARAM_BOUNDS: &[(f64, f64)] = &[
    (-5.0, 5.0),   // p1: low-flow segment log coefficient
    (0.0, 2.0),    // p2: low-flow segment exponent
    (0.0, 5.0),    // p3: low-flow fade-out slope on ln q
    (-20.0, 20.0), // p4: low-flow fade-out offset
    (-5.0, 5.0),   // p5: high-flow segment log coefficient
    (0.0, 2.0),    // p6: high-flow segment exponent
    (-5.0, 0.0),   // p7: high-flow fade-in slope on ln q
    (-20.0, 20.0), // p8: high-flow fade-in offset
    (0.0, 10.0),   // ctf: cease-to-flow level [m]
];

pub const LEVEL_DEFAULTS: &[f64] = &[-1.0, 0.45, 1.0, -6.0, -1.5, 0.35, -1.0, 6.0, 0.0];

/// Flow parameters followed by the rating-curve parameters.
pub const PARAM_NAMES_WITH_LEVEL: &[&str] = &[
    "d", "f", "e", "c", "alpha", "tau_q", "tau_s", "p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8",
    "ctf",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_extend_flow_names() {
        assert_eq!(PARAM_NAMES.len(), N_PARAMS);
        assert_eq!(LEVEL_PARAM_NAMES.len(), N_LEVEL_PARAMS);
        assert_eq!(LEVEL_PARAM_BOUNDS.len(), N_LEVEL_PARAMS);
        assert_eq!(LEVEL_DEFAULTS.len(), N_LEVEL_PARAMS);
        assert_eq!(&PARAM_NAMES_WITH_LEVEL[..N_PARAMS], PARAM_NAMES);
        assert_eq!(&PARAM_NAMES_WITH_LEVEL[N_PARAMS..], LEVEL_PARAM_NAMES);
    }
}
