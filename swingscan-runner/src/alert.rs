//! Notification boundary.
//!
//! The monitor hands each check's new detections to an [`AlertSink`].
//! Formatting and delivery to chat channels live behind this trait.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::calendar::CheckSlot;
use crate::pipeline::Detection;

/// New detections from one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub slot: CheckSlot,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("alert receiver dropped")]
    Closed,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError>;
}

/// Writes every detection to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        for detection in &alert.detections {
            match detection {
                Detection::Signal(s) => info!(
                    symbol = %s.symbol,
                    kind = %s.kind,
                    timestamp = %s.timestamp,
                    price = s.price,
                    volume_ratio = s.volume_ratio,
                    level = s.level,
                    "signal"
                ),
                Detection::Pattern(p) => info!(
                    symbol = %p.symbol,
                    kind = %p.kind,
                    timestamp = %p.confirm_timestamp,
                    entry = p.entry,
                    stop = p.stop,
                    target = p.target,
                    "pattern"
                ),
            }
        }
        Ok(())
    }
}

/// Forwards alerts over a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Alert>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AlertSink for ChannelSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        self.tx.send(alert.clone()).await.map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot() -> CheckSlot {
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        CheckSlot {
            at: day.and_hms_opt(10, 15, 30).unwrap(),
            boundary: day.and_hms_opt(10, 15, 0).unwrap(),
            window_start: day.and_hms_opt(9, 15, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn channel_sink_forwards_alerts() {
        let (sink, mut rx) = ChannelSink::new(4);
        let alert = Alert {
            slot: slot(),
            detections: Vec::new(),
        };
        sink.deliver(&alert).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), alert);
    }

    #[tokio::test]
    async fn channel_sink_reports_closed_receiver() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);
        let alert = Alert {
            slot: slot(),
            detections: Vec::new(),
        };
        assert!(matches!(sink.deliver(&alert).await, Err(SinkError::Closed)));
    }
}
