//! Per-connection state.
//!
//! A [`Connection`] owns the write half of one client socket, serializes
//! every write through a lock so frames never interleave, and holds the
//! connection's single region subscription.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use futures::{Sink, SinkExt};
use lifegrid_core::manager::GameManager;
use lifegrid_grid::{GridEvent, GridObserver, RegionObserver};
use lifegrid_types::{ConnectionId, ObserverId, Rectangle};
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore, mpsc};
use tracing::debug;

use crate::error::ConnectionError;
use crate::protocol::OutgoingMessage;

/// Write half of a client socket, carrying rendered frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ConnectionError> + Send>>;

/// The connection's active region subscription.
struct Subscription {
    id: ObserverId,
    observer: Arc<RegionObserver>,
}

/// What [`Connection::observe`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// A new region observer was registered with the grid.
    Created,
    /// The existing observer was moved to the new bounds.
    Repositioned,
}

/// State for one connected client.
pub struct Connection {
    id: ConnectionId,
    manager: Arc<GameManager>,
    sink: AsyncMutex<FrameSink>,
    region: Mutex<Option<Subscription>>,
    slots: Arc<Semaphore>,
}

impl Connection {
    /// Wrap a socket write half. At most `max_in_flight` commands run at once.
    pub fn new(sink: FrameSink, manager: Arc<GameManager>, max_in_flight: usize) -> Self {
        Self {
            id: ConnectionId::new(),
            manager,
            sink: AsyncMutex::new(sink),
            region: Mutex::new(None),
            slots: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Connection identifier used in logs.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// The shared game manager.
    pub const fn manager(&self) -> &Arc<GameManager> {
        &self.manager
    }

    /// Write one frame. Concurrent callers are serialized.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] if the socket rejects the frame.
    pub async fn send(&self, message: &OutgoingMessage) -> Result<(), ConnectionError> {
        let frame = message.to_string();
        self.sink.lock().await.send(frame).await
    }

    /// Wait for a free command slot.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Closed`] once the connection has been closed.
    pub async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, ConnectionError> {
        Ok(Arc::clone(&self.slots).acquire_owned().await?)
    }

    /// Start observing `bounds`, or move the existing observer there.
    ///
    /// A new observer queues clipped events without blocking the grid. A
    /// forwarding task moves them into `events` in order, waiting for room
    /// as needed, and exits once the observer is dropped.
    pub fn observe(
        &self,
        bounds: Rectangle,
        events: &mpsc::Sender<OutgoingMessage>,
    ) -> ObserveOutcome {
        let mut region = self.region.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sub) = region.as_ref() {
            sub.observer.set_region(bounds);
            return ObserveOutcome::Repositioned;
        }

        let (queue, pending) = mpsc::unbounded_channel();
        tokio::spawn(forward_events(self.id, pending, events.clone()));

        let connection = self.id;
        let observer = Arc::new(RegionObserver::new(bounds, move |event: GridEvent| {
            if queue.send(OutgoingMessage::observe_event(&event)).is_err() {
                debug!(%connection, kind = event.kind(), "event forwarder gone");
            }
        }));
        let handle: Arc<dyn GridObserver> = observer.clone();
        let id = self.manager.grid().add_observer(handle);
        *region = Some(Subscription { id, observer });
        ObserveOutcome::Created
    }

    /// Stop observing. Returns `false` if no region was active.
    pub fn unobserve(&self) -> bool {
        let taken = self
            .region
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(sub) => {
                self.manager.grid().remove_observer(sub.id);
                true
            }
            None => false,
        }
    }

    /// Bounds of the active region, if any.
    pub fn observed_region(&self) -> Option<Rectangle> {
        self.region
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|sub| sub.observer.bounds())
    }

    /// Tear down: drop the subscription, refuse new commands, close the sink.
    pub async fn close(&self) {
        self.unobserve();
        self.slots.close();
        if let Err(e) = self.sink.lock().await.close().await {
            debug!(connection = %self.id, error = %e, "socket close failed");
        }
    }
}

/// Relay queued region events into the observe command's output until the
/// observer is dropped or the output closes.
async fn forward_events(
    connection: ConnectionId,
    mut pending: mpsc::UnboundedReceiver<OutgoingMessage>,
    events: mpsc::Sender<OutgoingMessage>,
) {
    while let Some(message) = pending.recv().await {
        if events.send(message).await.is_err() {
            debug!(%connection, "observe output closed, stopping event relay");
            return;
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("region", &self.observed_region())
            .finish_non_exhaustive()
    }
}
