//! Channel glue: decision-event fan-out and the shutdown signal

use tokio::sync::{broadcast, watch};
use tracing::trace;

use super::errors::{EngineError, Result};
use super::traits::Broadcaster;
use super::types::DecisionEvent;

/// Default capacity for the decision-event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Broadcaster backed by a `tokio::sync::broadcast` channel.
///
/// `publish` never blocks; a lagging subscriber drops its own backlog
/// without affecting other subscribers or the pipeline.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<DecisionEvent>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attach a new observer
    pub fn subscribe(&self) -> broadcast::Receiver<DecisionEvent> {
        self.sender.subscribe()
    }

    /// Number of currently attached observers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, event: DecisionEvent) {
        // send only errors when there are no receivers; that is not a fault
        if self.sender.send(event).is_err() {
            trace!("decision event dropped: no subscribers");
        }
    }
}

/// Signals process shutdown to an in-flight cycle.
///
/// Cloneable; handed to every suspension point so a cycle can abort cleanly
/// instead of leaving half-finished work behind.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        while !*receiver.borrow() {
            if receiver.changed().await.is_err() {
                // handle dropped without signalling: never cancels
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run a future, aborting with `EngineError::Cancelled` on shutdown
    pub async fn guard<F>(&self, future: F) -> Result<F::Output>
    where
        F: std::future::Future,
    {
        tokio::select! {
            output = future => Ok(output),
            _ = self.cancelled() => Err(EngineError::Cancelled),
        }
    }
}

/// Owning side of the shutdown signal
#[derive(Debug)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
    }
}

/// Create a linked shutdown handle/signal pair
pub fn shutdown_channel() -> (ShutdownHandle, Shutdown) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownHandle { sender }, Shutdown { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::DecisionOutcome;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn sample_event() -> DecisionEvent {
        DecisionEvent {
            symbol: "BTC/USDT".to_string(),
            outcome: DecisionOutcome::Executed,
            investment_usdt: Decimal::from(50),
            final_profit_usdt: Decimal::ONE,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let broadcaster = ChannelBroadcaster::new();
        broadcaster.publish(sample_event());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let broadcaster = ChannelBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        broadcaster.publish(sample_event());

        let event = receiver.recv().await.expect("event");
        assert_eq!(event.symbol, "BTC/USDT");
        assert_eq!(event.outcome, DecisionOutcome::Executed);
    }

    #[tokio::test]
    async fn test_guard_aborts_on_shutdown() {
        let (handle, shutdown) = shutdown_channel();
        handle.shutdown();

        let result = shutdown
            .guard(tokio::time::sleep(std::time::Duration::from_secs(60)))
            .await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_guard_passes_through_when_not_cancelled() {
        let (_handle, shutdown) = shutdown_channel();
        let value = shutdown.guard(async { 7 }).await.expect("not cancelled");
        assert_eq!(value, 7);
    }
}
