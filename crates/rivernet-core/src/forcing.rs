//! Date-indexed forcing data shared read-only by every node.
//!
//! [`Climate`] holds one rainfall and one evaporation (or temperature) series
//! per gauge over a single date index. [`DatedFrame`] is the loose tabular
//! form used before alignment; [`align_time_frame`] trims any number of
//! frames to their common period.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::DataAlignmentError;

/// What the second climate series of each gauge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvapKind {
    /// Evapotranspiration [mm/timestep].
    #[default]
    Evapotranspiration,
    /// Mean air temperature [°C].
    Temperature,
}

/// Climate inputs for one gauge at one timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    /// Rainfall [mm/timestep].
    pub rainfall: f64,
    /// Evapotranspiration [mm/timestep] or temperature [°C], see [`EvapKind`].
    pub evap: f64,
    pub kind: EvapKind,
}

impl ClimateSample {
    pub fn new(rainfall: f64, evap: f64) -> Self {
        Self {
            rainfall,
            evap,
            kind: EvapKind::Evapotranspiration,
        }
    }

    pub fn with_temperature(rainfall: f64, temperature: f64) -> Self {
        Self {
            rainfall,
            evap: temperature,
            kind: EvapKind::Temperature,
        }
    }
}

/// A table of named numeric columns over a shared date index.
///
/// Values may contain NaN (gaps in observations); only the date index is
/// validated.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedFrame {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl DatedFrame {
    /// Create an empty-columned frame over `dates`.
    ///
    /// Dates must be non-empty and strictly increasing.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, DataAlignmentError> {
        validate_dates(&dates)?;
        Ok(Self {
            dates,
            columns: BTreeMap::new(),
        })
    }

    /// Add a column; its length must match the date index.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, DataAlignmentError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(DataAlignmentError::LengthMismatch {
                name,
                expected: self.dates.len(),
                got: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Rows whose date falls within `[start, end]`, in original order.
    fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        Self {
            dates: self.dates[lo..hi].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v[lo..hi].to_vec()))
                .collect(),
        }
    }
}

fn validate_dates(dates: &[NaiveDate]) -> Result<(), DataAlignmentError> {
    if dates.is_empty() {
        return Err(DataAlignmentError::InvalidDateIndex {
            reason: "date index is empty".to_string(),
        });
    }
    if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
        return Err(DataAlignmentError::InvalidDateIndex {
            reason: format!("dates not strictly increasing at {}", w[1]),
        });
    }
    Ok(())
}

/// First and last date covered by every frame.
pub fn find_common_timeframe(
    frames: &[DatedFrame],
) -> Result<(NaiveDate, NaiveDate), DataAlignmentError> {
    let start = frames.iter().map(DatedFrame::first_date).max();
    let end = frames.iter().map(DatedFrame::last_date).min();
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Ok((start, end)),
        _ => Err(DataAlignmentError::NoOverlap),
    }
}

/// Trim every frame to the period shared by all of them.
///
/// Frames are returned in input order with their row order preserved.
/// Re-aligning already aligned frames returns them unchanged.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataAlignmentError::NoOverlap`] | No date range is shared, or a frame has no rows inside it |
pub fn align_time_frame(frames: &[DatedFrame]) -> Result<Vec<DatedFrame>, DataAlignmentError> {
    let (start, end) = find_common_timeframe(frames)?;
    let aligned: Vec<DatedFrame> = frames.iter().map(|f| f.slice_dates(start, end)).collect();
    if aligned.iter().any(DatedFrame::is_empty) {
        return Err(DataAlignmentError::NoOverlap);
    }
    debug!(%start, %end, n_frames = frames.len(), "aligned time frames");
    Ok(aligned)
}

/// Immutable climate forcing: per-gauge rainfall and evaporation series
/// over one date index.
#[derive(Debug, Clone, PartialEq)]
pub struct Climate {
    dates: Vec<NaiveDate>,
    rainfall: BTreeMap<String, Vec<f64>>,
    evap: BTreeMap<String, Vec<f64>>,
    kind: EvapKind,
}

impl Climate {
    /// Create a climate with no gauges over `dates`.
    pub fn new(dates: Vec<NaiveDate>, kind: EvapKind) -> Result<Self, DataAlignmentError> {
        validate_dates(&dates)?;
        Ok(Self {
            dates,
            rainfall: BTreeMap::new(),
            evap: BTreeMap::new(),
            kind,
        })
    }

    /// Add rainfall and evaporation series for one gauge.
    ///
    /// Both series must match the date index and hold only finite values.
    pub fn with_gauge(
        mut self,
        gauge: impl Into<String>,
        rainfall: Vec<f64>,
        evap: Vec<f64>,
    ) -> Result<Self, DataAlignmentError> {
        let gauge = gauge.into();
        self.check_series(&format!("{gauge} rainfall"), &rainfall)?;
        self.check_series(&format!("{gauge} evaporation"), &evap)?;
        self.rainfall.insert(gauge.clone(), rainfall);
        self.evap.insert(gauge, evap);
        Ok(self)
    }

    /// Build from a frame whose columns are named `<gauge><suffix>`.
    ///
    /// Every column ending in `rain_suffix` defines a gauge; the matching
    /// `<gauge><evap_suffix>` column must exist.
    pub fn from_frame(
        frame: &DatedFrame,
        rain_suffix: &str,
        evap_suffix: &str,
        kind: EvapKind,
    ) -> Result<Self, DataAlignmentError> {
        let mut climate = Self::new(frame.dates().to_vec(), kind)?;
        for (name, rain) in &frame.columns {
            let Some(gauge) = name.strip_suffix(rain_suffix) else {
                continue;
            };
            let evap_col = format!("{gauge}{evap_suffix}");
            let evap = frame
                .column(&evap_col)
                .ok_or_else(|| DataAlignmentError::MissingSeries {
                    gauge: gauge.to_string(),
                    variable: "evaporation",
                })?;
            climate = climate.with_gauge(gauge, rain.clone(), evap.to_vec())?;
        }
        Ok(climate)
    }

    fn check_series(&self, name: &str, values: &[f64]) -> Result<(), DataAlignmentError> {
        if values.len() != self.dates.len() {
            return Err(DataAlignmentError::LengthMismatch {
                name: name.to_string(),
                expected: self.dates.len(),
                got: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(DataAlignmentError::NonFiniteValue {
                name: name.to_string(),
                index,
            });
        }
        Ok(())
    }

    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn kind(&self) -> EvapKind {
        self.kind
    }

    pub fn gauges(&self) -> impl Iterator<Item = &str> {
        self.rainfall.keys().map(String::as_str)
    }

    /// Fail unless both series exist for `gauge`.
    pub fn require_gauge(&self, gauge: &str) -> Result<(), DataAlignmentError> {
        if !self.rainfall.contains_key(gauge) {
            return Err(DataAlignmentError::MissingSeries {
                gauge: gauge.to_string(),
                variable: "rainfall",
            });
        }
        if !self.evap.contains_key(gauge) {
            return Err(DataAlignmentError::MissingSeries {
                gauge: gauge.to_string(),
                variable: "evaporation",
            });
        }
        Ok(())
    }

    /// Climate inputs of `gauge` at `timestep`.
    pub fn sample(&self, gauge: &str, timestep: usize) -> Result<ClimateSample, DataAlignmentError> {
        self.require_gauge(gauge)?;
        if timestep >= self.dates.len() {
            return Err(DataAlignmentError::MissingTimestep {
                name: "climate".to_string(),
                timestep,
                len: self.dates.len(),
            });
        }
        Ok(ClimateSample {
            rainfall: self.rainfall[gauge][timestep],
            evap: self.evap[gauge][timestep],
            kind: self.kind,
        })
    }

    /// Timestep index of `date`.
    pub fn timestep_of(&self, date: NaiveDate) -> Result<usize, DataAlignmentError> {
        self.dates
            .binary_search(&date)
            .map_err(|_| DataAlignmentError::MissingDate { date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(start: (i32, u32, u32), n: usize) -> Vec<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap();
        first.iter_days().take(n).collect()
    }

    fn frame(start: (i32, u32, u32), values: Vec<f64>) -> DatedFrame {
        DatedFrame::new(days(start, values.len()))
            .unwrap()
            .with_column("flow", values)
            .unwrap()
    }

    // -- DatedFrame --

    #[test]
    fn rejects_unsorted_dates() {
        let mut d = days((2000, 1, 1), 3);
        d.swap(0, 2);
        assert!(matches!(
            DatedFrame::new(d),
            Err(DataAlignmentError::InvalidDateIndex { .. })
        ));
    }

    #[test]
    fn rejects_column_length_mismatch() {
        let err = DatedFrame::new(days((2000, 1, 1), 3))
            .unwrap()
            .with_column("x", vec![1.0])
            .unwrap_err();
        assert!(matches!(err, DataAlignmentError::LengthMismatch { expected: 3, got: 1, .. }));
    }

    // -- Alignment --

    #[test]
    fn align_trims_to_common_period() {
        let a = frame((2000, 1, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = frame((2000, 1, 3), vec![10.0, 20.0, 30.0, 40.0, 50.0]);
        let aligned = align_time_frame(&[a, b]).unwrap();
        assert_eq!(aligned[0].column("flow").unwrap(), &[3.0, 4.0, 5.0]);
        assert_eq!(aligned[1].column("flow").unwrap(), &[10.0, 20.0, 30.0]);
        assert_eq!(aligned[0].dates(), aligned[1].dates());
    }

    #[test]
    fn align_is_idempotent() {
        let a = frame((2000, 1, 1), vec![1.0, 2.0, 3.0, 4.0]);
        let b = frame((2000, 1, 2), vec![5.0, 6.0, 7.0]);
        let once = align_time_frame(&[a, b]).unwrap();
        let twice = align_time_frame(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn align_fails_without_overlap() {
        let a = frame((2000, 1, 1), vec![1.0, 2.0]);
        let b = frame((2001, 1, 1), vec![1.0, 2.0]);
        assert_eq!(align_time_frame(&[a, b]), Err(DataAlignmentError::NoOverlap));
    }

    #[test]
    fn common_timeframe_bounds() {
        let a = frame((2000, 1, 1), vec![0.0; 10]);
        let b = frame((2000, 1, 4), vec![0.0; 3]);
        let (start, end) = find_common_timeframe(&[a, b]).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2000, 1, 4).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2000, 1, 6).unwrap());
    }

    // -- Climate --

    #[test]
    fn climate_from_frame_by_suffix() {
        let f = DatedFrame::new(days((2000, 1, 1), 2))
            .unwrap()
            .with_column("406214_rain", vec![1.0, 2.0])
            .unwrap()
            .with_column("406214_evap", vec![3.0, 4.0])
            .unwrap();
        let c = Climate::from_frame(&f, "_rain", "_evap", EvapKind::Evapotranspiration).unwrap();
        assert_eq!(c.gauges().collect::<Vec<_>>(), vec!["406214"]);
        let s = c.sample("406214", 1).unwrap();
        assert_eq!(s.rainfall, 2.0);
        assert_eq!(s.evap, 4.0);
    }

    #[test]
    fn climate_from_frame_missing_evap() {
        let f = DatedFrame::new(days((2000, 1, 1), 2))
            .unwrap()
            .with_column("a_rain", vec![1.0, 2.0])
            .unwrap();
        let err = Climate::from_frame(&f, "_rain", "_evap", EvapKind::Evapotranspiration);
        assert!(matches!(err, Err(DataAlignmentError::MissingSeries { .. })));
    }

    #[test]
    fn climate_rejects_nan() {
        let err = Climate::new(days((2000, 1, 1), 3), EvapKind::Evapotranspiration)
            .unwrap()
            .with_gauge("g", vec![1.0, f64::NAN, 1.0], vec![0.0; 3])
            .unwrap_err();
        assert!(matches!(err, DataAlignmentError::NonFiniteValue { index: 1, .. }));
    }

    #[test]
    fn climate_sample_out_of_range() {
        let c = Climate::new(days((2000, 1, 1), 3), EvapKind::Evapotranspiration)
            .unwrap()
            .with_gauge("g", vec![1.0; 3], vec![0.0; 3])
            .unwrap();
        assert!(matches!(
            c.sample("g", 3),
            Err(DataAlignmentError::MissingTimestep { timestep: 3, .. })
        ));
        assert!(matches!(
            c.sample("other", 0),
            Err(DataAlignmentError::MissingSeries { .. })
        ));
    }

    #[test]
    fn climate_timestep_lookup() {
        let c = Climate::new(days((2000, 1, 1), 5), EvapKind::Temperature).unwrap();
        let d = NaiveDate::from_ymd_opt(2000, 1, 4).unwrap();
        assert_eq!(c.timestep_of(d).unwrap(), 3);
        assert_eq!(c.kind(), EvapKind::Temperature);
    }
}
