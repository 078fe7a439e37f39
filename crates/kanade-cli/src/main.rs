mod discord;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use kanade_core::clock::SystemClock;
use kanade_core::config::AppConfig;
use kanade_core::controller::Controller;
use kanade_core::error::KanadeError;
use kanade_mpd::{MpdClient, MpdConnectOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::discord::DiscordPresence;

#[derive(Debug, Parser)]
#[command(name = "kanade", version, about = "Mirror what MPD is playing to Discord Rich Presence")]
struct Cli {
    /// Config file to use instead of the one in the user config directory.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level (same as setting KANADE_DEBUG).
    #[arg(short, long)]
    debug: bool,

    /// Seconds between polls.
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Discogs personal access token.
    #[arg(long, value_name = "TOKEN")]
    discogs_token: Option<String>,

    /// Last.fm API key.
    #[arg(long, value_name = "KEY")]
    lastfm_api_key: Option<String>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,

    /// Print where the user config file lives and exit.
    #[arg(long)]
    print_config_path: bool,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig, KanadeError> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load()?,
        };

        if let Some(secs) = self.interval {
            config.general.poll_interval_secs = secs;
        }
        if let Some(token) = &self.discogs_token {
            config.providers.discogs.token = Some(token.clone());
        }
        if let Some(key) = &self.lastfm_api_key {
            config.providers.lastfm.api_key = Some(key.clone());
        }
        Ok(config)
    }
}

fn init_tracing(debug: bool) {
    let default = if debug || std::env::var_os("KANADE_DEBUG").is_some() {
        "kanade=debug"
    } else {
        "kanade=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves when `signal` fires. If the handler could not be installed,
/// never resolves.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            error!(error = %e, "Could not listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), KanadeError> {
    let cli = Cli::parse();

    if cli.print_config_path {
        println!("{}", AppConfig::config_path().display());
        return Ok(());
    }

    let config = cli.load_config()?;
    if cli.print_config {
        let rendered =
            toml::to_string_pretty(&config).map_err(|e| KanadeError::Config(e.to_string()))?;
        print!("{rendered}");
        return Ok(());
    }

    init_tracing(cli.debug);

    if config.presence.application_id.trim().is_empty() {
        return Err(KanadeError::Config(
            "presence.application_id must be set".into(),
        ));
    }

    let options = MpdConnectOptions {
        host: config.mpd.host.clone(),
        port: config.mpd.port,
        password: config.mpd.password.clone(),
        timeout: config.general.request_timeout(),
    };
    let player = MpdClient::connect(options).await?;

    let mut controller = Controller::from_config(
        &config,
        player,
        DiscordPresence::new(),
        Arc::new(SystemClock),
    )?;

    controller
        .run(shutdown_on(tokio::signal::ctrl_c()))
        .await;

    controller.player_mut().close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        AppConfig::default().save_to(&path).unwrap();

        let cli = Cli::parse_from([
            "kanade",
            "--config",
            path.to_str().unwrap(),
            "--interval",
            "10",
            "--discogs-token",
            "secret",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.general.poll_interval_secs, 10);
        assert_eq!(config.providers.discogs.token.as_deref(), Some("secret"));
        assert_eq!(config.providers.lastfm.api_key, None);
    }

    #[tokio::test]
    async fn test_shutdown_waits_when_signal_unavailable() {
        let limit = std::time::Duration::from_millis(50);

        let broken = async { Err(std::io::Error::other("no signal handler")) };
        assert!(tokio::time::timeout(limit, shutdown_on(broken)).await.is_err());

        let fired = async { Ok(()) };
        assert!(tokio::time::timeout(limit, shutdown_on(fired)).await.is_ok());
    }
}
