//! Recorded-stream replay for the drowsiness monitor
//!
//! Reads JSON-lines detector records, feeds them to a [`FaceTracker`] whose
//! clock follows the record timestamps, and writes one analysis line per
//! frame update.

pub mod settings;

use alerting::{AlertChannel, AlertManager, ChannelHealth};
use anyhow::Context;
use dms::{AlertLevel, DmsConfig, DrowsinessEvent, FaceFrame, FaceTracker, FrameAnalysis, ManualClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// One line of a recorded detector stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayRecord {
    /// Detector started tracking a face
    New { timestamp_ms: u64, face_id: u32 },
    /// Detector output for the tracked face
    Update { timestamp_ms: u64, frame: FaceFrame },
    /// Face not found in this frame
    Missing { timestamp_ms: u64 },
    /// Tracking finished
    Done { timestamp_ms: u64 },
}

impl ReplayRecord {
    pub fn timestamp_ms(&self) -> u64 {
        match *self {
            Self::New { timestamp_ms, .. }
            | Self::Update { timestamp_ms, .. }
            | Self::Missing { timestamp_ms }
            | Self::Done { timestamp_ms } => timestamp_ms,
        }
    }
}

/// Totals for a finished replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub frames: u64,
    pub skipped_frames: u64,
    pub mild_alerts: u64,
    pub severe_alerts: u64,
    pub peak_level: AlertLevel,
    pub mild_channel: ChannelHealth,
    pub severe_channel: ChannelHealth,
}

/// Drives a tracker from recorded records
pub struct Replay {
    clock: Arc<ManualClock>,
    tracker: FaceTracker<Arc<ManualClock>>,
    last_timestamp_ms: Option<u64>,
    frames: u64,
    skipped_frames: u64,
    mild_alerts: u64,
    severe_alerts: u64,
    peak_level: AlertLevel,
    done: bool,
}

impl Replay {
    pub fn new(config: DmsConfig, alerts: AlertManager) -> anyhow::Result<Self> {
        let clock = Arc::new(ManualClock::new(0));
        let tracker = FaceTracker::new(config, Arc::clone(&clock), alerts)?;
        Ok(Self {
            clock,
            tracker,
            last_timestamp_ms: None,
            frames: 0,
            skipped_frames: 0,
            mild_alerts: 0,
            severe_alerts: 0,
            peak_level: AlertLevel::None,
            done: false,
        })
    }

    /// Apply one record; frame updates yield an analysis
    pub fn apply(&mut self, record: ReplayRecord) -> Option<FrameAnalysis> {
        let timestamp_ms = record.timestamp_ms();
        if let Some(last) = self.last_timestamp_ms.filter(|&last| timestamp_ms < last) {
            warn!(last, timestamp_ms, "Record timestamp went backwards");
        }
        self.last_timestamp_ms = Some(timestamp_ms);
        self.clock.set(timestamp_ms);

        match record {
            ReplayRecord::New { face_id, .. } => {
                self.tracker.on_new_item(face_id);
                None
            }
            ReplayRecord::Update { frame, .. } => {
                let analysis = self.tracker.on_update(&frame);
                self.record(&analysis);
                Some(analysis)
            }
            ReplayRecord::Missing { .. } => {
                self.tracker.on_missing();
                None
            }
            ReplayRecord::Done { .. } => {
                self.tracker.on_done();
                self.done = true;
                None
            }
        }
    }

    fn record(&mut self, analysis: &FrameAnalysis) {
        self.frames += 1;
        if analysis.skipped {
            self.skipped_frames += 1;
        }
        for event in &analysis.events {
            match event {
                DrowsinessEvent::EnteredMild => self.mild_alerts += 1,
                DrowsinessEvent::EnteredSevere => self.severe_alerts += 1,
                DrowsinessEvent::AlertsOff => {}
            }
        }
        self.peak_level = self.peak_level.max(analysis.level);
    }

    /// Snapshot of the counters so far
    pub fn summary(&self) -> ReplaySummary {
        let alerts = self.tracker.alerts();
        ReplaySummary {
            frames: self.frames,
            skipped_frames: self.skipped_frames,
            mild_alerts: self.mild_alerts,
            severe_alerts: self.severe_alerts,
            peak_level: self.peak_level,
            mild_channel: alerts.health(AlertChannel::Mild),
            severe_channel: alerts.health(AlertChannel::Severe),
        }
    }

    /// Consume a JSON-lines stream, writing one analysis per update.
    ///
    /// Blank lines and `#` comments are ignored. The tracker is torn down
    /// at end of input if the stream carried no `done` record.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> anyhow::Result<ReplaySummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record: ReplayRecord = serde_json::from_str(line)
                .with_context(|| format!("Invalid record on line {line_no}"))?;

            if let Some(analysis) = self.apply(record) {
                let mut out = serde_json::to_vec(&analysis)?;
                out.push(b'\n');
                writer.write_all(&out).await.context("Failed to write analysis")?;
            }
        }
        writer.flush().await?;
        debug!(lines = line_no, "Input exhausted");

        let summary = self.summary();
        if !self.done {
            self.tracker.on_done();
            self.done = true;
        }
        Ok(summary)
    }
}

/// Build the alert channels for a headless host
pub fn alert_manager(audio: bool) -> AlertManager {
    if audio {
        AlertManager::new(
            Ok(Box::new(alerting::TraceSink::new(AlertChannel::Mild))),
            Ok(Box::new(alerting::TraceSink::new(AlertChannel::Severe))),
        )
    } else {
        info!("Audio disabled, alerts are visual only");
        AlertManager::silent("audio disabled")
    }
}

/// Initialize logging (stderr; stdout carries analysis lines)
pub fn init_logging(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.expect("Failed to set tracing subscriber");
}
