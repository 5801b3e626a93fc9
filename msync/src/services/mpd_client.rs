//! MPD client
//!
//! Minimal async implementation of the MPD line protocol, covering the
//! three commands the sync engine needs: `list <tag>` for the artist set,
//! `search <tag> <name>` to recover an artist's exact catalogued spelling,
//! and `list album <tag> <artist>` for album titles.
//!
//! [`MpdSource`] wraps the raw client behind the [`MusicSource`] seam and
//! serializes access from parallel workers; after a connection error it
//! reconnects and retries the command once.

use super::MusicSource;
use async_trait::async_trait;
use msync_common::config::MpdConfig;
use msync_common::{Error, Result};
use std::collections::HashSet;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Which tag groups the library into "artists"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Artist,
    AlbumArtist,
}

impl TagField {
    /// Tag name as sent in commands
    pub fn command_name(self) -> &'static str {
        match self {
            TagField::Artist => "artist",
            TagField::AlbumArtist => "albumartist",
        }
    }

    /// Tag name as it appears in response lines
    pub fn response_key(self) -> &'static str {
        match self {
            TagField::Artist => "Artist",
            TagField::AlbumArtist => "AlbumArtist",
        }
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Raw MPD protocol client over a TCP stream
pub struct MpdClient {
    host: String,
    port: u16,
    connection: Option<Connection>,
}

impl MpdClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connection: None,
        }
    }

    /// Open the TCP connection and consume the server greeting
    pub async fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut greeting = String::new();
        reader.read_line(&mut greeting).await?;
        if !greeting.starts_with("OK MPD") {
            return Err(Error::Protocol(format!(
                "unexpected greeting: {}",
                greeting.trim_end()
            )));
        }
        self.connection = Some(Connection {
            reader,
            writer: write_half,
        });
        tracing::debug!(host = %self.host, port = self.port, "connected to mpd");
        Ok(())
    }

    /// Drop the current connection and open a fresh one
    pub async fn reconnect(&mut self) -> Result<()> {
        self.connection = None;
        self.connect().await
    }

    /// Send one command and collect the response lines up to the
    /// terminating `OK`. An `ACK` response is a protocol error; transport
    /// errors invalidate the connection so the next command reconnects.
    pub async fn command(&mut self, command: &str) -> Result<Vec<String>> {
        if self.connection.is_none() {
            self.connect().await?;
        }
        match self.exchange(command).await {
            Ok(lines) => Ok(lines),
            Err(e) => {
                if e.is_connection_error() {
                    self.connection = None;
                }
                Err(e)
            }
        }
    }

    /// Liveness check, the protocol `ping` command
    pub async fn ping(&mut self) -> Result<()> {
        self.command("ping").await.map(|_| ())
    }

    async fn exchange(&mut self, command: &str) -> Result<Vec<String>> {
        let Some(conn) = self.connection.as_mut() else {
            return Err(Error::Protocol("not connected".to_string()));
        };
        conn.writer.write_all(command.as_bytes()).await?;
        conn.writer.write_all(b"\n").await?;

        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let read = conn.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by mpd",
                )));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line == "OK" {
                return Ok(lines);
            }
            if let Some(ack) = line.strip_prefix("ACK ") {
                return Err(Error::Protocol(ack.to_string()));
            }
            lines.push(line.to_string());
        }
    }
}

/// Quote a command argument, escaping backslashes and double quotes
fn quote(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Values of one tag across response lines
fn tag_values(lines: &[String], key: &str) -> Vec<String> {
    let prefix = format!("{}: ", key);
    lines
        .iter()
        .filter_map(|line| line.strip_prefix(&prefix))
        .map(str::to_string)
        .collect()
}

/// The MPD library behind the [`MusicSource`] contract
pub struct MpdSource {
    client: Mutex<MpdClient>,
    tag: TagField,
}

impl MpdSource {
    pub fn new(config: &MpdConfig) -> Self {
        let tag = if config.use_albumartist {
            TagField::AlbumArtist
        } else {
            TagField::Artist
        };
        Self::with_address(&config.host, config.port, tag)
    }

    pub fn with_address(host: &str, port: u16, tag: TagField) -> Self {
        Self {
            client: Mutex::new(MpdClient::new(host, port)),
            tag,
        }
    }
}

#[async_trait]
impl MusicSource for MpdSource {
    async fn list_artists(&self) -> Result<HashSet<String>> {
        let command = format!("list {}", self.tag.command_name());
        let mut client = self.client.lock().await;
        let lines = match client.command(&command).await {
            Ok(lines) => lines,
            Err(e) if e.is_connection_error() => {
                client.reconnect().await?;
                client.command(&command).await?
            }
            Err(e) => return Err(e),
        };
        Ok(tag_values(&lines, self.tag.response_key())
            .into_iter()
            .filter(|name| !name.is_empty())
            .map(|name| name.to_lowercase())
            .collect())
    }

    async fn list_albums(&self, artist: &str) -> Result<Vec<String>> {
        let mut client = self.client.lock().await;
        if client.ping().await.is_err() {
            client.reconnect().await?;
        }

        // search matches case-insensitively; the response carries the
        // exact spelling that list requires
        let search = format!(
            "search {} {}",
            self.tag.command_name(),
            quote(artist)
        );
        let lines = client.command(&search).await?;
        let exact = tag_values(&lines, self.tag.response_key())
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::ArtistNotFound(format!("{} is not in the mpd database", artist))
            })?;

        let list = format!(
            "list album {} {}",
            self.tag.command_name(),
            quote(&exact)
        );
        let lines = client.command(&list).await?;
        Ok(tag_values(&lines, "Album"))
    }
}
