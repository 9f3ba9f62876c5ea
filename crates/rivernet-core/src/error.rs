//! Error types for network construction, data alignment, parameters and
//! simulation.

use chrono::NaiveDate;

/// Errors from building or traversing a network topology.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// Returned when the topology description cannot be read into node specs.
    #[error("malformed topology description: {reason}")]
    MalformedSpec {
        /// Deserializer message.
        reason: String,
    },

    /// Returned when the topology contains no nodes.
    #[error("network must contain at least one node")]
    EmptyNetwork,

    /// Returned when two nodes share a name or gauge identifier.
    #[error("duplicate node identifier \"{id}\"")]
    DuplicateIdentifier {
        /// The repeated identifier.
        id: String,
    },

    /// Returned when an inlet, outlet or lookup names a node that does not exist.
    #[error("node \"{node}\" references unknown node \"{missing}\"")]
    UnknownNode {
        /// Node holding the reference (empty for direct lookups).
        node: String,
        /// The identifier that could not be resolved.
        missing: String,
    },

    /// Returned when a node would drain into more than one downstream node.
    #[error("node \"{node}\" has multiple outlets: {outlets:?}")]
    MultipleOutlets {
        /// Node with the ambiguous outlet set.
        node: String,
        /// All downstream candidates found.
        outlets: Vec<String>,
    },

    /// Returned when a declared `outlets` entry disagrees with the inlet lists.
    #[error("node \"{node}\" declares outlet \"{declared}\" but is not an inlet of it")]
    InconsistentOutlet {
        /// Node with the declaration.
        node: String,
        /// Declared outlet.
        declared: String,
    },

    /// Returned when an objective is judged at a node its target does not drain into.
    #[error("node \"{judged_at}\" is not downstream of \"{node}\"")]
    NotDownstream {
        /// Node whose parameters are calibrated.
        node: String,
        /// Node where performance is judged.
        judged_at: String,
    },

    /// Returned when the flow graph contains a cycle.
    #[error("cycle detected in network at node \"{node}\"")]
    Cycle {
        /// A node on the cycle.
        node: String,
    },

    /// Returned when a reservoir storage-level table is unusable.
    #[error("invalid storage relation for node \"{node}\": {reason}")]
    InvalidStorageRelation {
        /// Reservoir node name.
        node: String,
        /// What is wrong with the table.
        reason: String,
    },

    /// Returned when a physical attribute is out of its valid range.
    #[error("invalid attribute {attribute} = {value} for node \"{node}\"")]
    InvalidAttribute {
        /// Node name.
        node: String,
        /// Attribute name.
        attribute: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Errors from misaligned or missing forcing and observation data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataAlignmentError {
    /// Returned when the series handed to alignment share no common period.
    #[error("time series have no overlapping period")]
    NoOverlap,

    /// Returned when a dated frame is empty or its dates are not strictly increasing.
    #[error("invalid date index: {reason}")]
    InvalidDateIndex {
        /// What is wrong with the index.
        reason: String,
    },

    /// Returned when a column length does not match its date index.
    #[error("series \"{name}\" has {got} values, expected {expected}")]
    LengthMismatch {
        /// Column or series name.
        name: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when a forcing series holds NaN or infinity.
    #[error("series \"{name}\" contains a non-finite value at index {index}")]
    NonFiniteValue {
        /// Series name.
        name: String,
        /// Position of the first non-finite value.
        index: usize,
    },

    /// Returned when no climate series exists for a node's gauge.
    #[error("no {variable} series for gauge \"{gauge}\"")]
    MissingSeries {
        /// Gauge identifier.
        gauge: String,
        /// `rainfall` or `evaporation`.
        variable: &'static str,
    },

    /// Returned when a timestep lies outside the available data.
    #[error("timestep {timestep} is outside {name} (length {len})")]
    MissingTimestep {
        /// Name of the series that ran out.
        name: String,
        /// Requested timestep.
        timestep: usize,
        /// Number of available timesteps.
        len: usize,
    },

    /// Returned when a date is not present in the climate index.
    #[error("date {date} is not covered by the climate data")]
    MissingDate {
        /// Requested date.
        date: NaiveDate,
    },
}

/// Errors from applying a parameter vector to a node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// Returned when the vector length does not match the model's parameter count.
    #[error("{model} expects {expected} parameters, got {got}")]
    WrongLength {
        /// Model name.
        model: &'static str,
        /// Declared parameter count.
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// Returned when a value lies outside its declared bounds or is not finite.
    #[error("{name} = {value} is out of bounds [{min}, {max}]")]
    OutOfBounds {
        /// Parameter name.
        name: &'static str,
        /// Supplied value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Returned when a named parameter is not part of the model.
    #[error("{model} has no parameter named \"{name}\"")]
    UnknownParameter {
        /// Model name.
        model: &'static str,
        /// The unknown name.
        name: String,
    },
}

/// Errors raised while stepping a node through time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// Returned when a step would produce NaN or infinity.
    #[error("non-finite {variable} at timestep {timestep} in node \"{node}\"")]
    NonFinite {
        /// Node name.
        node: String,
        /// Timestep being evaluated.
        timestep: usize,
        /// First offending quantity.
        variable: &'static str,
    },

    /// Returned when a node is asked for a timestep other than its next one.
    #[error("node \"{node}\" expected timestep {expected}, got {got}")]
    OutOfOrder {
        /// Node name.
        node: String,
        /// Next timestep the node can evaluate.
        expected: usize,
        /// Requested timestep.
        got: usize,
    },

    /// Returned when a requested output variable is not recorded by a node.
    #[error("node \"{node}\" does not record \"{variable}\"")]
    UnknownOutput {
        /// Node name.
        node: String,
        /// Requested variable.
        variable: String,
    },
}

/// Any error produced by the simulation core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Topology problem.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Forcing or observation alignment problem.
    #[error(transparent)]
    DataAlignment(#[from] DataAlignmentError),
    /// Invalid parameter vector.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    /// Numerical failure during a step.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
