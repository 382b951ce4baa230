use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use crate::clock::Clock;
use crate::cluster::{ClusterClient, ContentLocator};
use crate::entry_type::EntryType;
use crate::error::{Error, Result};
use crate::lock;
use crate::stat::StatSnapshot;

/// A regular file, either fixed bytes or a window onto a remote file.
pub struct RegularFile {
    content: Content,
}

enum Content {
    Static { bytes: Vec<u8>, stat: StatSnapshot },
    Remote(RemoteContent),
}

struct RemoteContent {
    locator: ContentLocator,
    client: Arc<dyn ClusterClient>,
    clock: Arc<dyn Clock>,
    size_ttl: Duration,
    state: Mutex<SizeState>,
}

struct SizeState {
    stat: StatSnapshot,
    /// `None` until a size is known; such files fetch it on first stat.
    checked_at: Option<Instant>,
}

/// Serializes a record the way `state.json` files present it: four-space
/// indentation, keys in the order the remote sent them.
pub fn json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(out)
}

impl RegularFile {
    pub fn new_static<T: Into<Vec<u8>>>(content: T) -> Self {
        let bytes = content.into();
        let stat = StatSnapshot::file(bytes.len() as u64);
        Self {
            content: Content::Static { bytes, stat },
        }
    }

    pub fn new_json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::new_static(json_bytes(value)?))
    }

    /// A file whose bytes live at `locator`.
    ///
    /// `size` is the size reported by whoever discovered the file (e.g. a
    /// browse listing); it is trusted for `size_ttl` before being re-fetched.
    /// Without it the size is fetched on the first stat.
    pub fn new_remote(
        locator: ContentLocator,
        size: Option<u64>,
        modified_at: Option<SystemTime>,
        client: Arc<dyn ClusterClient>,
        clock: Arc<dyn Clock>,
        size_ttl: Duration,
    ) -> Self {
        let now = SystemTime::now();
        let mut stat = StatSnapshot::new(EntryType::File, size.unwrap_or(0), now);
        if let Some(mtime) = modified_at {
            stat = stat.with_modified(mtime);
        }
        let checked_at = size.map(|_| clock.now());
        Self {
            content: Content::Remote(RemoteContent {
                locator,
                client,
                clock,
                size_ttl,
                state: Mutex::new(SizeState { stat, checked_at }),
            }),
        }
    }

    pub fn locator(&self) -> Option<&ContentLocator> {
        match &self.content {
            Content::Static { .. } => None,
            Content::Remote(remote) => Some(&remote.locator),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.content, Content::Remote(_))
    }

    pub fn stat(&self) -> Result<StatSnapshot> {
        match &self.content {
            Content::Static { stat, .. } => Ok(*stat),
            Content::Remote(remote) => remote.stat(),
        }
    }

    /// Up to `length` bytes starting at `offset`; short at end of content.
    pub fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        match &self.content {
            Content::Static { bytes, .. } => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
                let len = usize::try_from(length).unwrap_or(usize::MAX);
                let end = start.saturating_add(len).min(bytes.len());
                Ok(bytes[start..end].to_vec())
            }
            Content::Remote(remote) => remote.read(offset, length),
        }
    }
}

impl RemoteContent {
    fn stat(&self) -> Result<StatSnapshot> {
        let now = self.clock.now();
        {
            let state = lock(&self.state);
            match state.checked_at {
                Some(at) if now.saturating_duration_since(at) <= self.size_ttl => {
                    return Ok(state.stat);
                }
                _ => {}
            }
        }

        let size = self.client.size(&self.locator)?;
        let locator = self.locator.to_string();
        diagnostics::debug!("Refreshed size of {locator}: {size}", locator: locator, size: size);

        let mut state = lock(&self.state);
        let previous = state.stat;
        if state.checked_at.is_none() {
            state.stat = previous.with_size(size, previous.modified_at());
        } else if size != previous.size_bytes() {
            state.stat = previous.with_size(size, SystemTime::now());
        }
        state.checked_at = Some(now);
        Ok(state.stat)
    }

    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let mut data = self
            .client
            .read(&self.locator, offset, length)
            .map_err(|e| match e {
                Error::RemoteRead { .. } => e,
                e if e.is_remote() => Error::remote_read(&self.locator, e),
                e => e,
            })?;
        data.truncate(usize::try_from(length).unwrap_or(usize::MAX));
        Ok(data)
    }
}
