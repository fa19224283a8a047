//! Replay of recorded sessions
//!
//! A recording is a JSON Lines file. Each line holds one landmark frame and,
//! optionally, the camera image it was estimated from:
//!
//! ```json
//! {"timestamp_ms": 0, "landmarks": [{"x": 0.5, "y": 0.2, "visibility": 0.9}], "frame": null}
//! ```

use crate::error::{RecordingError, Result};
use crate::frame::{FrameFormat, RawFrame};
use crate::landmark::{Landmark, LandmarkFrame};
use crate::session::{FrameSource, SessionInput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tracing::{debug, info};

/// Camera image stored in a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// One line of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp_ms: u64,
    pub landmarks: Vec<Landmark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameRecord>,
}

impl SessionRecord {
    pub fn landmarks_only(frame: &LandmarkFrame) -> Self {
        Self {
            timestamp_ms: frame.timestamp_ms,
            landmarks: frame.landmarks.clone(),
            frame: None,
        }
    }
}

/// Streaming reader over a recording file
pub struct RecordingFrameSource {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line_number: usize,
    records_read: u64,
    /// Wall-clock time mapped to the first record's capture time
    anchor: Option<(SystemTime, u64)>,
}

impl RecordingFrameSource {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        info!("Replaying recording {}", path.display());

        Ok(Self {
            lines: BufReader::new(file).lines(),
            path,
            line_number: 0,
            records_read: 0,
            anchor: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read the next record, skipping blank lines (None on EOF)
    pub async fn next_record(&mut self) -> Result<Option<SessionRecord>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record: SessionRecord =
                serde_json::from_str(trimmed).map_err(|e| RecordingError::MalformedRecord {
                    line: self.line_number,
                    details: e.to_string(),
                })?;
            self.records_read += 1;
            return Ok(Some(record));
        }

        if self.records_read == 0 {
            return Err(RecordingError::Empty.into());
        }
        debug!(
            "Reached end of {} after {} records",
            self.path.display(),
            self.records_read
        );
        Ok(None)
    }

    fn to_input(&mut self, record: SessionRecord) -> SessionInput {
        let (anchor_time, anchor_ms) = *self
            .anchor
            .get_or_insert((SystemTime::now(), record.timestamp_ms));
        let landmarks = LandmarkFrame::new(record.timestamp_ms, record.landmarks);

        let raw = record.frame.map(|frame| {
            let offset = Duration::from_millis(record.timestamp_ms.saturating_sub(anchor_ms));
            let earlier = Duration::from_millis(anchor_ms.saturating_sub(record.timestamp_ms));
            let timestamp = (anchor_time + offset)
                .checked_sub(earlier)
                .unwrap_or(anchor_time);
            let raw = RawFrame::new(
                self.records_read,
                timestamp,
                frame.data,
                frame.width,
                frame.height,
                frame.format,
            );
            match frame.device_id {
                Some(device_id) => raw.with_device_id(device_id),
                None => raw,
            }
        });

        SessionInput { landmarks, raw }
    }
}

#[async_trait]
impl FrameSource for RecordingFrameSource {
    async fn next_input(&mut self) -> Result<Option<SessionInput>> {
        match self.next_record().await? {
            Some(record) => Ok(Some(self.to_input(record))),
            None => Ok(None),
        }
    }
}

/// Read the first landmark frame of a recording (used for calibration)
pub async fn read_first_frame<P: AsRef<Path>>(path: P) -> Result<LandmarkFrame> {
    let mut source = RecordingFrameSource::open(path).await?;
    match source.next_record().await? {
        Some(record) => Ok(LandmarkFrame::new(record.timestamp_ms, record.landmarks)),
        None => Err(RecordingError::Empty.into()),
    }
}

/// Write records as JSON Lines
pub async fn write_recording<P: AsRef<Path>>(path: P, records: &[SessionRecord]) -> Result<()> {
    let mut file = File::create(path.as_ref()).await?;
    for record in records {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        file.write_all(&line).await?;
    }
    file.flush().await?;
    Ok(())
}
