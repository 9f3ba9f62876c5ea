/// IHACRES model state variables.
///
/// - `wetness`: catchment wetness index [mm]
/// - `quick_store`: quick-flow recession store [mm]
/// - `slow_store`: slow-flow recession store [mm]
use serde::Deserialize;

use super::constants::STATE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct State {
    pub wetness: f64,
    pub quick_store: f64,
    pub slow_store: f64,
}

impl State {
    pub fn to_array(&self) -> [f64; STATE_SIZE] {
        [self.wetness, self.quick_store, self.slow_store]
    }

    /// True when every store is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_dry() {
        let s = State::default();
        assert_eq!(s.to_array(), [0.0; STATE_SIZE]);
        assert!(s.is_valid());
    }

    #[test]
    fn negative_store_is_invalid() {
        let s = State {
            slow_store: -1.0,
            ..State::default()
        };
        assert!(!s.is_valid());
    }

    #[test]
    fn deserializes_partial_state() {
        let s: State = serde_json::from_str(r#"{"wetness": 12.5}"#).unwrap();
        assert_eq!(s.wetness, 12.5);
        assert_eq!(s.quick_store, 0.0);
    }
}
