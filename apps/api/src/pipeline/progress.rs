use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::pipeline::stage::StageKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// 0 – 100, non-decreasing within one run
    pub percentage: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageKind>,
}

impl ProgressEvent {
    pub fn new(percentage: u8, message: impl Into<String>, stage: Option<StageKind>) -> Self {
        Self {
            percentage: percentage.min(100),
            message: message.into(),
            stage,
        }
    }
}

/// Receives progress updates from an orchestrator run. Reporting never fails the run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Logs each event, tagged with a label such as the resume file name.
pub struct TracingProgress {
    label: String,
}

impl TracingProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        info!("[{}] {:>3}% {}", self.label, event.percentage, event.message);
    }
}

/// Forwards events to a channel. A dropped receiver is ignored.
pub struct ChannelProgress {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_capped_at_100() {
        assert_eq!(ProgressEvent::new(250, "done", None).percentage, 100);
    }

    #[test]
    fn test_channel_progress_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = ChannelProgress::new(tx);
        drop(rx);
        progress.report(ProgressEvent::new(10, "still fine", Some(StageKind::Extraction)));
    }
}
