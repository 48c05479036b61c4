use edms_model::ModelError;
use edms_types::Iid;

/// Errors raised while deriving side effects of a write.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A parameter is both option- and state-dependent.
    #[error("parameter {0} cannot be option- and state-dependent at once")]
    ConflictingDependence(Iid),

    #[error("{what} {iid} referenced by {holder} does not exist")]
    Dangling {
        what: &'static str,
        iid: Iid,
        holder: Iid,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}
