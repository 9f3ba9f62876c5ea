/// IHACRES-style rainfall-runoff node.
///
/// A catchment wetness index feeds effective rainfall into parallel quick
/// and slow exponential recession stores. Driven either by
/// evapotranspiration or by temperature. Outflow is rated to a stream level.
pub mod constants;
pub mod fluxes;
pub mod node;
pub mod params;
pub mod processes;
pub mod state;

pub use node::IhacresNode;
pub use params::{LevelParameters, Parameters};
pub use state::State;
