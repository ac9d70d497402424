use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    TransportLost,
    CapabilityNotFound,
    CapabilityExecutionFailed,
    EngineUnreachable,
    EngineBusy,
    EngineTimeout,
    EngineReported,
    MalformedInput,
    MalformedResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub context: String,
    pub timestamp_ms: i64,
}

impl Fault {
    pub fn new(kind: FaultKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Process-wide fault store: one evolving latest value plus best-effort
/// subscriber queues. Publishers are never blocked by slow consumers:
/// a full queue drops the fault instead of waiting.
#[derive(Default)]
pub struct FaultHub {
    inner: Mutex<Inner>,
    notify: Notify,
}

#[derive(Default)]
struct Inner {
    latest: Option<Fault>,
    subscribers: Vec<mpsc::Sender<Fault>>,
}

impl FaultHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest fault, wake waiters, and fan out to subscribers.
    pub fn publish(&self, fault: Fault) {
        debug!(kind = ?fault.kind, context = %fault.context, "Fault published");
        {
            let mut inner = self.inner.lock().unwrap();
            inner.latest = Some(fault.clone());
            inner.subscribers.retain(|tx| match tx.try_send(fault.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(kind = ?fault.kind, "Fault subscriber queue full, dropping");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }
        self.notify.notify_waiters();
    }

    pub fn latest(&self) -> Option<Fault> {
        self.inner.lock().unwrap().latest.clone()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().latest = None;
    }

    /// Wait for the next published fault. Returns None when the timeout
    /// elapses first.
    pub async fn await_next(&self, timeout: Duration) -> Option<Fault> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before racing the deadline so a publish in between is not missed.
        notified.as_mut().enable();
        match tokio::time::timeout(timeout, notified).await {
            Ok(()) => self.latest(),
            Err(_) => None,
        }
    }

    /// Queue-based subscription. Delivery is best-effort: if the receiver
    /// does not poll promptly the queue fills and newer faults are dropped.
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<Fault> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.inner.lock().unwrap().subscribers.push(tx);
        rx
    }
}
