use thiserror::Error;

/// Errors that stop kanade from starting.
#[derive(Debug, Error)]
pub enum KanadeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("player error: {0}")]
    Player(#[from] kanade_mpd::MpdError),

    #[error("API error: {0}")]
    Api(#[from] kanade_api::ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
