use thiserror::Error;

/// Failure taxonomy for the bridge.
///
/// `Connection` covers the Docker daemon being unreachable or the event
/// subscription dropping; `Delivery` covers the webhook rejecting or never
/// receiving a payload; `Render` covers events missing the fields a
/// notification needs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("docker daemon unreachable: {0}")]
    Connection(#[from] bollard::errors::Error),

    #[error("webhook delivery failed: {0}")]
    Delivery(String),

    #[error("malformed event: {0}")]
    Render(String),
}
