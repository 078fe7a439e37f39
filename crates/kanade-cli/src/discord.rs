//! Discord Rich Presence publisher.
//!
//! Wraps a `DiscordIpcClient`. The IPC socket is local and every call
//! blocks briefly, so it runs inline on the polling task.

use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use kanade_core::presence::{Activity, PresenceError, PresencePublisher};
use tracing::{debug, info};

#[derive(Default)]
pub struct DiscordPresence {
    client: Option<DiscordIpcClient>,
}

impl DiscordPresence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresencePublisher for DiscordPresence {
    fn login(&mut self, application_id: &str) -> Result<(), PresenceError> {
        let mut ipc = DiscordIpcClient::new(application_id);
        ipc.connect()
            .map_err(|e| PresenceError::Connect(e.to_string()))?;
        info!("Connected to Discord IPC");
        self.client = Some(ipc);
        Ok(())
    }

    fn logout(&mut self) -> Result<(), PresenceError> {
        let Some(mut ipc) = self.client.take() else {
            return Ok(());
        };
        if let Err(e) = ipc.clear_activity() {
            debug!(error = %e, "Failed to clear Discord activity");
        }
        ipc.close()
            .map_err(|e| PresenceError::Connect(e.to_string()))
    }

    fn set_activity(&mut self, activity: &Activity) -> Result<(), PresenceError> {
        let Some(ipc) = self.client.as_mut() else {
            return Err(PresenceError::Connect("not connected to Discord".into()));
        };

        let mut timestamps = activity::Timestamps::new().start(activity.start.timestamp());
        if let Some(end) = activity.end {
            timestamps = timestamps.end(end.timestamp());
        }

        let assets = activity::Assets::new()
            .large_image(&activity.large_image)
            .large_text(&activity.large_text)
            .small_image(&activity.small_image)
            .small_text(&activity.small_text);

        let mut payload = activity::Activity::new()
            .activity_type(activity::ActivityType::Listening)
            .details(&activity.details)
            .state(&activity.state)
            .timestamps(timestamps)
            .assets(assets);

        if !activity.buttons.is_empty() {
            let buttons = activity
                .buttons
                .iter()
                .map(|b| activity::Button::new(&b.label, &b.url))
                .collect();
            payload = payload.buttons(buttons);
        }

        ipc.set_activity(payload)
            .map_err(|e| PresenceError::Rejected(e.to_string()))
    }
}
