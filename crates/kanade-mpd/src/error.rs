use mpd_client::client::{CommandError, ConnectWithPasswordError};
use thiserror::Error;

/// Errors from the MPD client.
#[derive(Debug, Error)]
pub enum MpdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for MPD")]
    Timeout,

    #[error("could not connect to MPD: {0}")]
    Connect(#[from] ConnectWithPasswordError),

    #[error("MPD command failed: {0}")]
    Command(#[from] CommandError),
}
