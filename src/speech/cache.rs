//! Synthesized audio storage

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::Result;

/// URL prefix the HTTP server mounts the cache under
pub const AUDIO_ROUTE: &str = "/audio";

/// Reference to one stored reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioRef {
    /// File name inside the cache, `<prefix>_<millis>.mp3`
    pub file_name: String,
    /// URL the browser fetches, `/audio/<file_name>`
    pub url: String,
    /// Location on disk
    #[serde(skip)]
    pub path: PathBuf,
}

/// Append-only directory of synthesized MP3 files
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
}

impl AudioCache {
    /// Open (and create) the cache directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Cache directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh timestamped name
    ///
    /// Names are never overwritten; a clash bumps the timestamp.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub async fn store(&self, prefix: &str, bytes: &[u8]) -> Result<AudioRef> {
        let mut stamp = chrono::Utc::now().timestamp_millis();

        loop {
            let file_name = format!("{prefix}_{stamp}.mp3");
            let path = self.dir.join(&file_name);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    stamp += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            file.write_all(bytes).await?;
            file.flush().await?;

            tracing::debug!(file = %path.display(), bytes = bytes.len(), "stored reply audio");
            return Ok(AudioRef {
                url: format!("{AUDIO_ROUTE}/{file_name}"),
                file_name,
                path,
            });
        }
    }
}
