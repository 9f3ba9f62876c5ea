use rivernet_macros::Fluxes;

#[derive(Debug, Clone, Copy, Fluxes)]
pub struct StepFluxes {
    pub rainfall: f64,
    pub inflow: f64,
    pub outflow: f64,
}

fn main() {
    let f = StepFluxes { rainfall: 1.0, inflow: 2.0, outflow: 3.0 };
    let mut history = StepFluxesHistory::with_capacity(10);
    history.push(&f);
    assert_eq!(history.len(), 1);
    assert!(!history.is_empty());
    assert_eq!(history.series("outflow"), Some(&[3.0][..]));
    assert!(history.series("level").is_none());
    assert_eq!(history.record(0).map(|r| r.inflow), Some(2.0));
    assert!(history.record(1).is_none());
    assert_eq!(StepFluxes::field_names(), &["rainfall", "inflow", "outflow"]);

    history.clear();
    assert!(history.is_empty());
}
