/// Dam mass-balance process functions.
///
/// All volumes in ML. Depths in mm over an area in km² convert directly:
/// 1 mm over 1 km² is 1 ML.

/// Volumes entering and leaving the reservoir during one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassBalanceTerms {
    pub inflow: f64,
    pub rainfall: f64,
    pub evaporation: f64,
    pub seepage: f64,
    pub extraction: f64,
    /// Signed groundwater flux: positive is gain, negative loss to infiltration.
    pub exchange: f64,
}

/// Outcome of one mass-balance step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassBalance {
    pub volume: f64,
    pub spill: f64,
    /// Portion of the requested extraction that could be supplied.
    pub released: f64,
}

/// Convert a depth [mm] over `area` [km²] into a volume [ML].
#[inline]
pub fn depth_to_volume(depth_mm: f64, area_km2: f64) -> f64 {
    depth_mm * area_km2
}

/// Apply one timestep of the reservoir mass balance.
///
/// `new = clamp(old + inflow + rain - evap - seepage - extraction + exchange - spill, 0, max_store)`
/// where spill is whatever would exceed `max_store`. Extraction is only
/// released up to the water available once the other terms are applied.
pub fn mass_balance(volume: f64, terms: &MassBalanceTerms, max_store: f64) -> MassBalance {
    let before_extraction = volume + terms.inflow + terms.rainfall
        - terms.evaporation
        - terms.seepage
        + terms.exchange;
    let released = terms.extraction.max(0.0).min(before_extraction.max(0.0));
    let unbounded = before_extraction - released;
    let spill = (unbounded - max_store).max(0.0);
    MassBalance {
        volume: (unbounded - spill).clamp(0.0, max_store),
        spill,
        released,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn inflow_only(inflow: f64) -> MassBalanceTerms {
        MassBalanceTerms {
            inflow,
            ..MassBalanceTerms::default()
        }
    }

    #[test]
    fn inflow_below_capacity_is_stored() {
        let mb = mass_balance(400.0, &inflow_only(50.0), 1000.0);
        assert_relative_eq!(mb.volume, 450.0);
        assert_eq!(mb.spill, 0.0);
    }

    #[test]
    fn excess_inflow_spills() {
        let mb = mass_balance(900.0, &inflow_only(250.0), 1000.0);
        assert_relative_eq!(mb.volume, 1000.0);
        assert_relative_eq!(mb.spill, 150.0);
    }

    #[test]
    fn losses_clamp_at_empty() {
        let terms = MassBalanceTerms {
            evaporation: 30.0,
            seepage: 30.0,
            exchange: -50.0,
            ..MassBalanceTerms::default()
        };
        let mb = mass_balance(20.0, &terms, 1000.0);
        assert_eq!(mb.volume, 0.0);
        assert_eq!(mb.spill, 0.0);
    }

    #[test]
    fn extraction_limited_by_available_water() {
        let terms = MassBalanceTerms {
            inflow: 10.0,
            extraction: 100.0,
            ..MassBalanceTerms::default()
        };
        let mb = mass_balance(40.0, &terms, 1000.0);
        assert_relative_eq!(mb.released, 50.0);
        assert_eq!(mb.volume, 0.0);
    }

    #[test]
    fn full_balance_closes() {
        let terms = MassBalanceTerms {
            inflow: 120.0,
            rainfall: 8.0,
            evaporation: 5.0,
            seepage: 2.0,
            extraction: 30.0,
            exchange: -1.0,
        };
        let mb = mass_balance(500.0, &terms, 1000.0);
        assert_relative_eq!(mb.volume, 500.0 + 120.0 + 8.0 - 5.0 - 2.0 - 30.0 - 1.0);
        assert_relative_eq!(mb.released, 30.0);
    }

    #[test]
    fn depth_volume_conversion() {
        assert_relative_eq!(depth_to_volume(3.0, 2.5), 7.5);
    }
}
