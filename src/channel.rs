//! Ordered single-consumer event delivery between worker and controller
//!
//! The worker's execution context and the controller's communicate only
//! through this bounded channel; there is no shared mutable state between
//! them. Emission order is preserved for a job, and the terminal event is
//! always the last one delivered.
//!
//! Backpressure policy: progress updates may block for a short configured
//! timeout on a full channel and are dropped after it expires. Terminal
//! events (`Completed`/`Failed`/`Cancelled`) block until delivered and are
//! never dropped.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::types::Event;

/// Create a bounded event channel
///
/// Returns the worker-side sender and the controller-side receiver.
pub(crate) fn channel(capacity: usize, progress_send_timeout: Duration) -> (EventSender, EventChannel) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        EventSender {
            tx,
            progress_send_timeout,
        },
        EventChannel { rx },
    )
}

/// Worker-side handle for emitting lifecycle events
pub(crate) struct EventSender {
    tx: mpsc::Sender<Event>,
    progress_send_timeout: Duration,
}

impl EventSender {
    /// Emit a progress event
    ///
    /// On a full channel this blocks up to the configured timeout and then
    /// drops the update so a slow consumer can never stall the transfer
    /// indefinitely. The next progress emission carries a newer percentage
    /// anyway, so a dropped update loses no information.
    pub(crate) async fn progress(&self, event: Event) {
        debug_assert!(!event.is_terminal(), "terminal events must use terminal()");

        match self
            .tx
            .send_timeout(event, self.progress_send_timeout)
            .await
        {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(event)) => {
                tracing::debug!(
                    job_id = event.job_id().0,
                    "Event channel full, dropping progress update"
                );
            }
            Err(SendTimeoutError::Closed(_)) => {
                // Receiver dropped; the controller is gone and the worker
                // will observe cancellation shortly.
            }
        }
    }

    /// Emit the terminal event, consuming the sender
    ///
    /// Blocks until the event is accepted by the channel. Consuming `self`
    /// makes it impossible to emit anything after the terminal event.
    pub(crate) async fn terminal(self, event: Event) {
        debug_assert!(event.is_terminal(), "progress events must use progress()");

        if self.tx.send(event).await.is_err() {
            tracing::warn!("Event channel closed before terminal event could be delivered");
        }
    }
}

/// Controller-side receiving end of the event channel
///
/// Single consumer; events arrive in emission order.
pub struct EventChannel {
    rx: mpsc::Receiver<Event>,
}

impl EventChannel {
    /// Receive the next event
    ///
    /// Returns `None` once the worker has finished and all buffered events
    /// have been consumed.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobId;
    use std::path::PathBuf;

    fn progress(id: i64, percent: f32) -> Event {
        Event::Progress {
            id: JobId::new(id),
            percent,
        }
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (tx, mut rx) = channel(16, Duration::from_millis(50));

        tx.progress(progress(1, 25.0)).await;
        tx.progress(progress(1, 50.0)).await;
        tx.terminal(Event::Completed {
            id: JobId::new(1),
            path: PathBuf::from("/tmp/a.mp4"),
        })
        .await;

        let mut percents = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                Event::Progress { percent, .. } => percents.push(percent),
                Event::Completed { .. } => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(percents, vec![25.0, 50.0]);
    }

    #[tokio::test]
    async fn terminal_event_closes_the_channel() {
        let (tx, mut rx) = channel(4, Duration::from_millis(50));

        tx.terminal(Event::Cancelled { id: JobId::new(9) }).await;

        assert!(matches!(rx.recv().await, Some(Event::Cancelled { .. })));
        assert!(
            rx.recv().await.is_none(),
            "channel must be closed after the terminal event"
        );
    }

    #[tokio::test]
    async fn full_channel_drops_progress_but_never_the_terminal() {
        // Capacity 1 with an unread event: further progress sends time out
        let (tx, mut rx) = channel(1, Duration::from_millis(10));

        tx.progress(progress(1, 10.0)).await;
        // Channel is now full; this update is dropped after the timeout
        tx.progress(progress(1, 20.0)).await;

        // Terminal send blocks until the consumer drains the channel
        let terminal = tokio::spawn(async move {
            tx.terminal(Event::Completed {
                id: JobId::new(1),
                path: PathBuf::from("/tmp/a.mp4"),
            })
            .await;
        });

        let first = rx.recv().await.unwrap();
        assert!(
            matches!(first, Event::Progress { percent, .. } if percent == 10.0),
            "first buffered progress should survive, got {first:?}"
        );

        let second = rx.recv().await.unwrap();
        assert!(
            second.is_terminal(),
            "dropped progress must not reorder or displace the terminal event, got {second:?}"
        );

        terminal.await.unwrap();
    }

    #[tokio::test]
    async fn progress_send_does_not_block_longer_than_timeout() {
        let (tx, _rx_kept_alive) = {
            let (tx, rx) = channel(1, Duration::from_millis(20));
            (tx, rx)
        };

        tx.progress(progress(1, 10.0)).await;

        let start = std::time::Instant::now();
        tx.progress(progress(1, 20.0)).await; // nobody is reading
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "progress send must give up after the configured timeout"
        );
    }
}
