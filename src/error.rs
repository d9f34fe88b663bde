use thiserror::Error;

/// Recoverable failures of the BDD layer.
///
/// Violated preconditions (invalid node indices, double release, combining
/// BDDs of different kernels, an exhausted node table) are not represented
/// here: they panic.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BddError {
    #[error("computation was aborted by its handler")]
    Aborted,

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("invalid variable block [{first}, {last}]: {reason}")]
    InvalidBlock { first: u32, last: u32, reason: String },

    #[error("BDD has no model")]
    NoModel,

    #[error("kernel was sized for {0} variables")]
    TooManyVariables(u32),
}
