//! Decides whether a snapshot is news worth publishing.
//!
//! Normal playback moves the position forward by about one poll interval
//! each tick; that is suppressed. A new song, a jump backwards or a jump
//! further than the tolerance is published. Anything other than playing
//! closes the session.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::models::{PlaybackSnapshot, Song};
use crate::presence::{ActivityTemplate, PresenceError, PresencePublisher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Disconnected,
    Connected {
        last_song_id: u64,
        last_position: Duration,
        /// Whether the last `set_activity` went through.
        last_publish_ok: bool,
    },
}

/// What the reconciler did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Published,
    /// Same song, still playing along.
    Suppressed,
    /// Playback stopped; the session was closed.
    Reset,
    /// Not playing and no session open.
    Idle,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("login failed: {0}")]
    Login(#[source] PresenceError),

    #[error("publish failed: {0}")]
    Publish(#[source] PresenceError),
}

pub struct Reconciler {
    template: ActivityTemplate,
    tolerance: Duration,
    republish_on_failure: bool,
    session: Session,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    /// `tolerance` is the largest forward jump still treated as continued
    /// playback, normally one poll interval plus some slack.
    pub fn new(template: ActivityTemplate, tolerance: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            template,
            tolerance,
            republish_on_failure: false,
            session: Session::Disconnected,
            clock,
        }
    }

    /// Publish again after a failed update even if the song did not change.
    pub fn republish_on_failure(mut self, enabled: bool) -> Self {
        self.republish_on_failure = enabled;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.session, Session::Connected { .. })
    }

    pub fn reconcile<D: PresencePublisher>(
        &mut self,
        snapshot: &PlaybackSnapshot,
        publisher: &mut D,
    ) -> Result<Decision, ReconcileError> {
        let Some((song, position)) = snapshot.now_playing() else {
            return Ok(if self.disconnect(publisher) {
                info!(state = %snapshot.state, "Not playing");
                Decision::Reset
            } else {
                Decision::Idle
            });
        };

        if self.is_ongoing(song.id, position) {
            debug!(song_id = song.id, ?position, "Ongoing activity, ignoring");
            if let Session::Connected { last_position, .. } = &mut self.session {
                *last_position = position;
            }
            return Ok(Decision::Suppressed);
        }

        self.publish(song, position, publisher)
    }

    /// Close the session if one is open. Returns whether it was.
    pub fn disconnect<D: PresencePublisher>(&mut self, publisher: &mut D) -> bool {
        if !self.is_connected() {
            return false;
        }
        if let Err(e) = publisher.logout() {
            warn!(error = %e, "Presence logout failed");
        }
        self.session = Session::Disconnected;
        true
    }

    fn is_ongoing(&self, song_id: u64, position: Duration) -> bool {
        let Session::Connected {
            last_song_id,
            last_position,
            last_publish_ok,
        } = &self.session
        else {
            return false;
        };

        if *last_song_id != song_id {
            return false;
        }
        if self.republish_on_failure && !last_publish_ok {
            return false;
        }
        // Backwards is a seek or a restart.
        position
            .checked_sub(*last_position)
            .is_some_and(|advance| advance <= self.tolerance)
    }

    fn publish<D: PresencePublisher>(
        &mut self,
        song: &Song,
        position: Duration,
        publisher: &mut D,
    ) -> Result<Decision, ReconcileError> {
        if let Session::Connected {
            last_song_id,
            last_position,
            ..
        } = &self.session
        {
            debug!(
                last_song_id,
                song_id = song.id,
                ?last_position,
                ?position,
                "New event"
            );
        } else {
            publisher
                .login(self.template.application_id())
                .map_err(ReconcileError::Login)?;
            info!("Connected to presence service");
        }

        // Recorded before the update; a failed publish is not rolled back.
        self.session = Session::Connected {
            last_song_id: song.id,
            last_position: position,
            last_publish_ok: false,
        };

        let activity = self.template.build(song, position, self.clock.now());
        publisher
            .set_activity(&activity)
            .map_err(ReconcileError::Publish)?;

        if let Session::Connected {
            last_publish_ok, ..
        } = &mut self.session
        {
            *last_publish_ok = true;
        }

        info!(
            song = %song.title,
            album = %song.album,
            artist = %song.artist,
            year = ?song.year,
            duration = ?song.duration,
            ?position,
            artwork_provider = ?song.artwork_provider,
            "Now playing"
        );
        Ok(Decision::Published)
    }
}
