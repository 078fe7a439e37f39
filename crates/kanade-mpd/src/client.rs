use std::collections::HashMap;
use std::time::Duration;

use mpd_client::client::{CommandError, ConnectionEvents};
use mpd_client::commands;
use mpd_client::responses::{PlayState, SongInQueue, Status};
use mpd_client::tag::Tag;
use mpd_client::Client;
use tokio::net::TcpStream;
use tokio::time::error::Elapsed;
use tracing::{debug, info};

use crate::error::MpdError;
use crate::Attrs;

/// Where and how to reach MPD.
#[derive(Debug, Clone)]
pub struct MpdConnectOptions {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Bound on dialing and on each command round trip.
    pub timeout: Duration,
}

impl MpdConnectOptions {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for MpdConnectOptions {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6600,
            password: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// MPD connection that survives daemon restarts.
///
/// Dials once in [`MpdClient::connect`]. If the connection closes or a
/// command times out it is dropped, and the next command dials again.
pub struct MpdClient {
    options: MpdConnectOptions,
    conn: Option<Connection>,
}

struct Connection {
    client: Client,
    // Held so the client's event channel stays open.
    _events: ConnectionEvents,
}

impl MpdClient {
    /// Connect to MPD. Fails if the daemon is unreachable or rejects the password.
    pub async fn connect(options: MpdConnectOptions) -> Result<Self, MpdError> {
        let conn = dial(&options).await?;
        info!(addr = %options.addr(), "Connected to MPD");
        Ok(Self {
            options,
            conn: Some(conn),
        })
    }

    /// The `status` fields the poll loop reads.
    pub async fn read_status(&mut self) -> Result<Attrs, MpdError> {
        let client = self.client().await?;
        let result =
            tokio::time::timeout(self.options.timeout, client.command(commands::Status)).await;
        let status = self.settle(result)?;
        Ok(status_attrs(&status))
    }

    /// Tags of the current song; empty when nothing is queued.
    pub async fn read_current_song(&mut self) -> Result<Attrs, MpdError> {
        let client = self.client().await?;
        let result =
            tokio::time::timeout(self.options.timeout, client.command(commands::CurrentSong))
                .await;
        let song = self.settle(result)?;
        Ok(song.as_ref().map(song_attrs).unwrap_or_default())
    }

    /// Drop the connection.
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!("Closed MPD connection");
        }
    }

    async fn client(&mut self) -> Result<Client, MpdError> {
        if let Some(conn) = &self.conn {
            if !conn.client.is_connection_closed() {
                return Ok(conn.client.clone());
            }
        }
        let conn = dial(&self.options).await?;
        debug!(addr = %self.options.addr(), "Reconnected to MPD");
        let client = conn.client.clone();
        self.conn = Some(conn);
        Ok(client)
    }

    /// Unwrap a command result, dropping the connection if it is gone or hung.
    fn settle<T>(
        &mut self,
        result: Result<Result<T, CommandError>, Elapsed>,
    ) -> Result<T, MpdError> {
        let err = match result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => MpdError::Command(e),
            Err(_) => MpdError::Timeout,
        };
        let closed = self.conn.as_ref().map_or(true, |c| c.client.is_connection_closed());
        if closed || matches!(err, MpdError::Timeout) {
            debug!(error = %err, "Dropping MPD connection");
            self.conn = None;
        }
        Err(err)
    }
}

async fn dial(options: &MpdConnectOptions) -> Result<Connection, MpdError> {
    let attempt = async {
        let stream = TcpStream::connect(options.addr()).await?;
        let (client, events) =
            Client::connect_with_password_opt(stream, options.password.as_deref()).await?;
        Ok::<_, MpdError>(Connection {
            client,
            _events: events,
        })
    };
    tokio::time::timeout(options.timeout, attempt)
        .await
        .unwrap_or(Err(MpdError::Timeout))
}

fn status_attrs(status: &Status) -> Attrs {
    playback_attrs(
        &status.state,
        status.current_song.as_ref().map(|(_, id)| id.0),
        status.elapsed,
    )
}

/// `state`, `songid` and `elapsed`, formatted the way MPD sends them.
fn playback_attrs(state: &PlayState, song_id: Option<u64>, elapsed: Option<Duration>) -> Attrs {
    let mut attrs = Attrs::new();
    let state = match state {
        PlayState::Playing => "play",
        PlayState::Paused => "pause",
        _ => "stop",
    };
    attrs.insert("state".into(), state.into());
    if let Some(id) = song_id {
        attrs.insert("songid".into(), id.to_string());
    }
    if let Some(elapsed) = elapsed {
        attrs.insert("elapsed".into(), format!("{:.3}", elapsed.as_secs_f64()));
    }
    attrs
}

fn song_attrs(current: &SongInQueue) -> Attrs {
    track_attrs(
        current.id.0,
        &current.song.url,
        current.song.duration,
        &current.song.tags,
    )
}

/// `currentsong` fields under MPD's names. A repeated tag keeps its first value.
fn track_attrs(
    id: u64,
    file: &str,
    duration: Option<Duration>,
    tags: &HashMap<Tag, Vec<String>>,
) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("Id".into(), id.to_string());
    attrs.insert("file".into(), file.to_string());
    if let Some(duration) = duration {
        attrs.insert("duration".into(), format!("{:.3}", duration.as_secs_f64()));
    }

    let wanted = [
        (Tag::Title, "Title"),
        (Tag::Name, "Name"),
        (Tag::Artist, "Artist"),
        (Tag::Album, "Album"),
        (Tag::AlbumArtist, "AlbumArtist"),
        (Tag::Date, "Date"),
        (Tag::Genre, "Genre"),
    ];
    for (tag, key) in wanted {
        if let Some(value) = tags.get(&tag).and_then(|values| values.first()) {
            attrs.insert(key.to_string(), value.clone());
        }
    }
    attrs
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    fn get<'a>(attrs: &'a Attrs, key: &str) -> Option<&'a str> {
        attrs.get(key).map(String::as_str)
    }

    #[test]
    fn test_playback_attrs() {
        let attrs = playback_attrs(
            &PlayState::Playing,
            Some(7),
            Some(Duration::from_millis(10_250)),
        );
        assert_eq!(get(&attrs, "state"), Some("play"));
        assert_eq!(get(&attrs, "songid"), Some("7"));
        assert_eq!(get(&attrs, "elapsed"), Some("10.250"));

        let stopped = playback_attrs(&PlayState::Stopped, None, None);
        assert_eq!(get(&stopped, "state"), Some("stop"));
        assert!(!stopped.contains_key("songid"));
        assert!(!stopped.contains_key("elapsed"));
    }

    #[test]
    fn test_track_attrs_first_value_wins() {
        let mut tags = HashMap::new();
        tags.insert(Tag::Title, vec!["Reckoner".to_string()]);
        tags.insert(
            Tag::Artist,
            vec!["Radiohead".to_string(), "Thom Yorke".to_string()],
        );
        tags.insert(Tag::Album, vec!["In Rainbows".to_string()]);
        tags.insert(Tag::Date, vec!["2007-10-10".to_string()]);

        let attrs = track_attrs(
            42,
            "Radiohead/In Rainbows/07 Reckoner.flac",
            Some(Duration::from_secs(290)),
            &tags,
        );
        assert_eq!(get(&attrs, "Id"), Some("42"));
        assert_eq!(get(&attrs, "file"), Some("Radiohead/In Rainbows/07 Reckoner.flac"));
        assert_eq!(get(&attrs, "duration"), Some("290.000"));
        assert_eq!(get(&attrs, "Title"), Some("Reckoner"));
        assert_eq!(get(&attrs, "Artist"), Some("Radiohead"));
        assert_eq!(get(&attrs, "Date"), Some("2007-10-10"));
        assert!(!attrs.contains_key("Genre"));
    }

    #[test]
    fn test_stream_without_duration() {
        let mut tags = HashMap::new();
        tags.insert(Tag::Name, vec!["Radio X".to_string()]);

        let attrs = track_attrs(3, "http://stream.example/live", None, &tags);
        assert_eq!(get(&attrs, "Name"), Some("Radio X"));
        assert!(!attrs.contains_key("duration"));
        assert!(!attrs.contains_key("Title"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = MpdClient::connect(MpdConnectOptions {
            host: "127.0.0.1".into(),
            port,
            ..Default::default()
        })
        .await;
        assert!(matches!(result, Err(MpdError::Io(_))));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            // Accept but never send the greeting.
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = MpdClient::connect(MpdConnectOptions {
            host: "127.0.0.1".into(),
            port,
            password: None,
            timeout: Duration::from_millis(200),
        })
        .await;
        assert!(matches!(result, Err(MpdError::Timeout)));
    }
}
