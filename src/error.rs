use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced to the host. Every collaborator error is caught at the
/// call site and mapped into one of these; none of them should ever crash the
/// widget.
#[derive(Debug, Error)]
pub enum Error {
    /// User input failed the mode-appropriate location requirement. Shown as
    /// a form-level message; nothing is written to the store.
    #[error("{0}")]
    Validation(String),

    /// The store rejected or failed a read/write. In-memory state is
    /// retained.
    #[error("Storage operation failed")]
    Persistence(#[source] anyhow::Error),

    /// The weather provider failed. Only blocking when no prior data exists;
    /// otherwise the stale display is kept.
    #[error("Unable to load weather data")]
    Fetch(#[source] anyhow::Error),

    /// No usable location is configured. Rendered as a "please configure"
    /// prompt, not a fault.
    #[error("No location configured")]
    NoLocation,
}
