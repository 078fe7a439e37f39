//! `{placeholder}` substitution for presence text and button URLs.
//!
//! Known placeholders: `{title}`, `{artist}`, `{album}`, `{album_artist}`,
//! `{year}`, `{genre}`. Anything else in braces is left untouched.

use url::form_urlencoded;

use crate::models::Song;

/// Render a display string.
pub fn render(template: &str, song: &Song) -> String {
    substitute(template, |name| value(song, name))
}

/// Render a URL, query-escaping each substituted value.
pub fn render_url(template: &str, song: &Song) -> String {
    substitute(template, |name| {
        value(song, name).map(|v| form_urlencoded::byte_serialize(v.as_bytes()).collect())
    })
}

fn value(song: &Song, name: &str) -> Option<String> {
    let v = match name {
        "title" => song.title.clone(),
        "artist" => song.artist.clone(),
        "album" => song.album.clone(),
        "album_artist" => song
            .album_artist
            .clone()
            .unwrap_or_else(|| song.artist.clone()),
        "year" => song.year.map(|y| y.to_string()).unwrap_or_default(),
        "genre" => song.genre.clone().unwrap_or_default(),
        _ => return None,
    };
    Some(v)
}

fn substitute(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match lookup(name) {
                    Some(v) => out.push_str(&v),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
