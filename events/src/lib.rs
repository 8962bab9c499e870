use datasets::DatasetId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetEvent {
    Added(DatasetId),
    Removed(DatasetId),
    DataChanged(DatasetId),
    SelectionChanged(DatasetId),
}

impl DatasetEvent {
    pub fn dataset(&self) -> DatasetId {
        match *self {
            DatasetEvent::Added(id)
            | DatasetEvent::Removed(id)
            | DatasetEvent::DataChanged(id)
            | DatasetEvent::SelectionChanged(id) => id,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("event bus is gone")]
    Disconnected,
    #[error("event bus lock poisoned")]
    Poisoned,
}

/// Host-side notification channel handed to plugins.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DatasetEvent) -> Result<(), EventError>;
    fn subscribe(&self) -> Result<Subscription, EventError>;
}

type Subscribers = Mutex<Vec<(u64, Sender<DatasetEvent>)>>;

/// Receiving end of a subscription; unsubscribes when dropped.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<DatasetEvent>,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn try_recv(&self) -> Result<Option<DatasetEvent>, EventError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(EventError::Disconnected),
        }
    }

    pub fn drain(&self) -> Result<Vec<DatasetEvent>, EventError> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv()? {
            events.push(event);
        }
        Ok(events)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(subscribers) = self.subscribers.upgrade() else {
            return;
        };
        if let Ok(mut subscribers) = subscribers.lock() {
            subscribers.retain(|(id, _)| *id != self.id);
        };
    }
}

#[derive(Debug, Default)]
pub struct InProcessEventBus {
    subscribers: Arc<Subscribers>,
    next_id: AtomicU64,
}

impl InProcessEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: DatasetEvent) -> Result<(), EventError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| EventError::Poisoned)?;
        subscribers.retain(|(id, sender)| {
            let delivered = sender.send(event).is_ok();
            if !delivered {
                log::debug!("dropping disconnected subscriber {id}");
            }
            delivered
        });
        Ok(())
    }

    fn subscribe(&self) -> Result<Subscription, EventError> {
        let (sender, receiver) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .map_err(|_| EventError::Poisoned)?
            .push((id, sender));
        Ok(Subscription {
            id,
            receiver,
            subscribers: Arc::downgrade(&self.subscribers),
        })
    }
}
