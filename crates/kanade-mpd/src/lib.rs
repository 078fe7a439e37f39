//! Player status source backed by the Music Player Daemon.
//!
//! Exposes the [`PlayerSource`] trait consumed by the poll loop and
//! [`MpdClient`], which runs `status` and `currentsong` through the
//! `mpd_client` crate and hands back MPD's fields as plain attribute maps.

pub mod client;
pub mod error;

use std::collections::HashMap;
use std::future::Future;

pub use client::{MpdClient, MpdConnectOptions};
pub use error::MpdError;

/// A `key: value` response block as returned by MPD.
pub type Attrs = HashMap<String, String>;

/// Something that can report what the player is doing.
///
/// Both calls may fail with a connectivity error; the caller decides
/// whether to retry.
pub trait PlayerSource: Send {
    /// Current playback status (`state`, `songid`, `elapsed`, `time`, ...).
    fn status(&mut self) -> impl Future<Output = Result<Attrs, MpdError>> + Send;

    /// Tags of the current song (`Id`, `Title`, `Artist`, `Album`, ...).
    fn current_track(&mut self) -> impl Future<Output = Result<Attrs, MpdError>> + Send;
}

impl PlayerSource for MpdClient {
    async fn status(&mut self) -> Result<Attrs, MpdError> {
        self.read_status().await
    }

    async fn current_track(&mut self) -> Result<Attrs, MpdError> {
        self.read_current_song().await
    }
}
