/// Errors surfaced by the external store seams.
///
/// Implementors map their own failure types into these variants; the
/// server treats every store failure the same way (log and degrade),
/// so two variants are enough to keep logs useful.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing service could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store was reachable but the operation failed.
    #[error("store query failed: {0}")]
    Query(String),
}
