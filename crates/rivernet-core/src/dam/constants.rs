/// Dam constants and parameter contract.
use super::relation::StorageRelation;

pub const MODEL_NAME: &str = "Dam";

/// Parameter names in order.
pub const PARAM_NAMES: &[&str] = &["evap_factor", "seepage_rate"];

pub const N_PARAMS: usize = 2;

/// Parameter bounds as (min, max) tuples, in PARAM_NAMES order.
pub const PARAM_BOUNDS: &[(f64, f64)] = &[
    (0.5, 1.5),  // evap_factor: open-water to forcing ET ratio [-]
    (0.0, 20.0), // seepage_rate: loss through the bed [mm/timestep]
];

pub const DEFAULTS: &[f64] = &[1.0, 0.0];

// -- Default storage relations (volume in ML) --

/// Water level [m AHD] = 156.8 + 0.9463 * V^0.2922
pub const DEFAULT_LEVEL: StorageRelation = StorageRelation::Power {
    offset: 156.8,
    coefficient: 0.9463,
    exponent: 0.2922,
};

/// Surface area [km²] = 0.0146 * V^0.6312
pub const DEFAULT_AREA: StorageRelation = StorageRelation::Power {
    offset: 0.0,
    coefficient: 0.0146,
    exponent: 0.6312,
};
