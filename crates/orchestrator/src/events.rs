use tokio::sync::mpsc;

use caravan_types::{DeploymentEvent, EventSink};

/// Event sink backed by an unbounded tokio channel. Sending never blocks;
/// a closed receiver is ignored rather than failing the run.
#[derive(Debug, Clone)]
pub struct MpscEventSink {
    tx: mpsc::UnboundedSender<DeploymentEvent>,
}

impl MpscEventSink {
    pub fn new(tx: mpsc::UnboundedSender<DeploymentEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for MpscEventSink {
    fn emit(&self, event: DeploymentEvent) {
        let _ = self.tx.send(event);
    }
}

/// Convenience constructor for a sink plus its subscriber end.
pub fn event_channel() -> (MpscEventSink, mpsc::UnboundedReceiver<DeploymentEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MpscEventSink::new(tx), rx)
}
