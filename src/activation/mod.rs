use std::path::PathBuf;
use thiserror::Error;

pub mod reconciler;
pub mod registrar;
pub mod runtime;

/// Failures of the wrapper registration and activation layer.
///
/// Registration failures are rolled back before they surface; a missing
/// real binary is a hard launch failure. Individual extension-install
/// failures never appear here - they are logged and retried on the next
/// activation cycle.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("{ide} is not registered for deferred activation; run 'idebox wrap {ide}' first")]
    NotRegistered { ide: String },

    #[error(
        "real {ide} binary is missing at {path}; re-export the IDE or restore the sidecar binary"
    )]
    RealBinaryMissing { ide: String, path: PathBuf },

    #[error("failed to install wrapper for {ide}: {reason}")]
    WrapperInstallFailed { ide: String, reason: String },
}
