//! The poll loop.
//!
//! [`Controller`] owns every piece of mutable state (player connection,
//! presence session, caches) and advances it one tick at a time with
//! [`Controller::step`]. [`Controller::run`] drives the steps from a tokio
//! interval until told to stop.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kanade_mpd::PlayerSource;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::error::KanadeError;
use crate::presence::{ActivityTemplate, PresencePublisher};
use crate::reconciler::{Decision, ReconcileError, Reconciler};
use crate::resolver::MetadataResolver;
use crate::snapshot::SnapshotBuilder;

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Published,
    Suppressed,
    /// Playback stopped and the presence was cleared.
    Reset,
    Idle,
    /// The player could not be reached.
    PlayerUnavailable,
    /// The player's answer could not be turned into a snapshot.
    SnapshotFailed,
    /// The presence service could not be reached.
    LoginFailed,
    /// The presence service refused the update.
    PublishFailed,
}

pub struct Controller<P, D> {
    player: P,
    publisher: D,
    builder: SnapshotBuilder,
    reconciler: Reconciler,
    poll_interval: Duration,
}

impl<P, D> Controller<P, D>
where
    P: PlayerSource,
    D: PresencePublisher,
{
    pub fn new(
        player: P,
        publisher: D,
        builder: SnapshotBuilder,
        reconciler: Reconciler,
        poll_interval: Duration,
    ) -> Self {
        Self {
            player,
            publisher,
            builder,
            reconciler,
            poll_interval,
        }
    }

    /// Wire up providers, caches and reconciler from config.
    pub fn from_config(
        config: &AppConfig,
        player: P,
        publisher: D,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, KanadeError> {
        let resolver = MetadataResolver::from_config(config, clock.clone())?;
        let builder = SnapshotBuilder::new(resolver, clock.clone());
        let reconciler = Reconciler::new(
            ActivityTemplate::new(config.presence.clone()),
            config.general.seek_tolerance(),
            clock,
        )
        .republish_on_failure(config.presence.republish_on_failure);

        Ok(Self::new(
            player,
            publisher,
            builder,
            reconciler,
            config.general.poll_interval(),
        ))
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn publisher(&self) -> &D {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut D {
        &mut self.publisher
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// One poll: fetch status, build a snapshot, reconcile.
    pub async fn step(&mut self) -> StepOutcome {
        let swept = self.builder.sweep();
        if swept > 0 {
            debug!(swept, "Dropped expired cache entries");
        }

        let started = Instant::now();
        let status = match self.player.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    error = %e,
                    sleep = ?self.poll_interval,
                    "Player unavailable, will try again soon"
                );
                self.reconciler.disconnect(&mut self.publisher);
                return StepOutcome::PlayerUnavailable;
            }
        };

        let snapshot = match self.builder.build(&status, &mut self.player).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    error = %e,
                    sleep = ?self.poll_interval,
                    "Could not read now playing, will try again soon"
                );
                self.reconciler.disconnect(&mut self.publisher);
                return StepOutcome::SnapshotFailed;
            }
        };
        debug!(took = ?started.elapsed(), state = %snapshot.state, "Got player info");

        match self.reconciler.reconcile(&snapshot, &mut self.publisher) {
            Ok(Decision::Published) => StepOutcome::Published,
            Ok(Decision::Suppressed) => StepOutcome::Suppressed,
            Ok(Decision::Reset) => StepOutcome::Reset,
            Ok(Decision::Idle) => StepOutcome::Idle,
            Err(ReconcileError::Login(e)) => {
                warn!(error = %e, "Could not connect to presence service, will retry later");
                StepOutcome::LoginFailed
            }
            Err(ReconcileError::Publish(e)) => {
                warn!(error = %e, "Could not set activity, will retry later");
                StepOutcome::PublishFailed
            }
        }
    }

    /// Poll every interval until `shutdown` resolves, then clear the presence.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval = ?self.poll_interval, "Polling player");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let outcome = self.step().await;
                    debug!(?outcome, "Poll finished");
                }
            }
        }

        self.shutdown();
    }

    /// Close the presence session, if any.
    pub fn shutdown(&mut self) {
        if self.reconciler.disconnect(&mut self.publisher) {
            info!("Presence cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use chrono::Utc;
    use kanade_mpd::MpdError;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::PresenceConfig;
    use crate::presence::tests::RecordingPublisher;
    use crate::reconciler::Session;
    use crate::snapshot::tests::{attrs, example_track, FakePlayer};

    type TestController = Controller<FakePlayer, RecordingPublisher>;

    fn controller(
        statuses: Vec<Result<kanade_mpd::Attrs, MpdError>>,
    ) -> (Arc<ManualClock>, TestController) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let resolver = MetadataResolver::new(vec![], clock.clone());
        let builder = SnapshotBuilder::new(resolver, clock.clone());
        let reconciler = Reconciler::new(
            ActivityTemplate::new(PresenceConfig::default()),
            Duration::from_secs(7),
            clock.clone(),
        );
        let player = FakePlayer {
            statuses: VecDeque::from(statuses),
            track: example_track(),
            ..Default::default()
        };
        let controller = Controller::new(
            player,
            RecordingPublisher::default(),
            builder,
            reconciler,
            Duration::from_secs(5),
        );
        (clock, controller)
    }

    fn play(time: &str) -> Result<kanade_mpd::Attrs, MpdError> {
        Ok(attrs(&[("state", "play"), ("time", time), ("songid", "7")]))
    }

    fn stop() -> Result<kanade_mpd::Attrs, MpdError> {
        Ok(attrs(&[("state", "stop")]))
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let (clock, mut controller) = controller(vec![play("10:200"), play("15:200")]);

        assert_eq!(controller.step().await, StepOutcome::Published);
        let activity = controller.publisher().activities[0].clone();
        assert_eq!(activity.details, "Example");
        assert_eq!(activity.large_image, "applemusic");
        assert_eq!(activity.start, clock.now() - chrono::Duration::seconds(10));

        clock.advance(Duration::from_secs(5));
        assert_eq!(controller.step().await, StepOutcome::Suppressed);
        assert_eq!(controller.publisher().activities.len(), 1);
        assert_eq!(controller.player_mut().track_calls, 1);
    }

    #[tokio::test]
    async fn test_stop_then_idle() {
        let (_, mut controller) = controller(vec![play("10:200"), stop(), stop()]);

        assert_eq!(controller.step().await, StepOutcome::Published);
        assert_eq!(controller.step().await, StepOutcome::Reset);
        assert_eq!(controller.step().await, StepOutcome::Idle);
        assert_eq!(controller.publisher().logouts, 1);
    }

    #[tokio::test]
    async fn test_player_loss_disconnects() {
        let (_, mut controller) = controller(vec![
            play("10:200"),
            Err(MpdError::Timeout),
            play("20:200"),
        ]);

        assert_eq!(controller.step().await, StepOutcome::Published);
        assert_eq!(controller.step().await, StepOutcome::PlayerUnavailable);
        assert_eq!(controller.reconciler().session(), &Session::Disconnected);
        assert_eq!(controller.publisher().logouts, 1);

        // Back again: new session, new publish.
        assert_eq!(controller.step().await, StepOutcome::Published);
        assert_eq!(controller.publisher().logins, 2);
    }

    #[tokio::test]
    async fn test_bad_status_disconnects() {
        let (_, mut controller) = controller(vec![
            play("10:200"),
            Ok(attrs(&[("state", "play"), ("time", "x:200"), ("songid", "7")])),
        ]);

        controller.step().await;
        assert_eq!(controller.step().await, StepOutcome::SnapshotFailed);
        assert!(!controller.reconciler().is_connected());
    }

    #[tokio::test]
    async fn test_publish_failure_continues() {
        let (_, mut controller) = controller(vec![play("10:200"), play("15:200")]);
        controller.publisher_mut().fail_publish = true;

        assert_eq!(controller.step().await, StepOutcome::PublishFailed);
        assert!(controller.reconciler().is_connected());
        assert_eq!(controller.step().await, StepOutcome::Suppressed);
    }

    #[tokio::test]
    async fn test_login_failure_retries() {
        let (_, mut controller) = controller(vec![play("10:200"), play("15:200")]);
        controller.publisher_mut().fail_login = true;

        assert_eq!(controller.step().await, StepOutcome::LoginFailed);
        controller.publisher_mut().fail_login = false;
        assert_eq!(controller.step().await, StepOutcome::Published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_shutdown() {
        let (_, mut controller) = controller(vec![play("10:200"), play("15:200"), play("20:200")]);

        controller.run(tokio::time::sleep(Duration::from_secs(12))).await;

        // Ticks at 0s, 5s and 10s; then the presence is cleared.
        assert_eq!(controller.publisher().activities.len(), 1);
        assert_eq!(controller.publisher().logouts, 1);
        assert_eq!(controller.player_mut().statuses.len(), 0);
    }
}
