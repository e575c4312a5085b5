// ── Per-item apply status ──

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Which family an apply event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Input,
    Feed,
}

/// Outcome of one attempted write, reported as it happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub item: String,
    pub kind: ResourceKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusEvent {
    pub fn ok(kind: ResourceKind, item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            kind,
            success: true,
            message: None,
        }
    }

    pub fn failed(kind: ResourceKind, item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            kind,
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Receives status events while an apply runs.
pub trait StatusSink {
    fn emit(&mut self, event: StatusEvent);
}

impl StatusSink for Vec<StatusEvent> {
    fn emit(&mut self, event: StatusEvent) {
        self.push(event);
    }
}

impl StatusSink for UnboundedSender<StatusEvent> {
    fn emit(&mut self, event: StatusEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.send(event);
    }
}

/// Discards every event.
impl StatusSink for () {
    fn emit(&mut self, _event: StatusEvent) {}
}

/// Everything an apply reported, for callers without a live sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub events: Vec<StatusEvent>,
    /// Failures not tied to a single item.
    pub errors: Vec<String>,
    /// Node registered and at least one channel configured.
    pub valid: bool,
}

impl ApplyReport {
    pub fn succeeded(&self) -> usize {
        self.events.iter().filter(|e| e.success).count()
    }

    pub fn failed(&self) -> usize {
        self.events.iter().filter(|e| !e.success).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || !self.errors.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut sink = tx;
        sink.emit(StatusEvent::ok(ResourceKind::Feed, "f"));
        assert_eq!(rx.try_recv().unwrap().item, "f");
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<StatusEvent>();
        drop(rx);
        let mut sink = tx;
        sink.emit(StatusEvent::ok(ResourceKind::Input, "i"));
    }

    #[test]
    fn report_counts() {
        let report = ApplyReport {
            events: vec![
                StatusEvent::ok(ResourceKind::Input, "a"),
                StatusEvent::failed(ResourceKind::Feed, "b", "exists"),
            ],
            ..ApplyReport::default()
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert!(!ApplyReport::default().has_failures());
    }
}
