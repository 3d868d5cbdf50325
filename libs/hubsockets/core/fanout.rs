//! Event fan-out
//!
//! The receive loop hands every tracked event to [`EventFanout::publish`],
//! which only pushes onto an unbounded crossbeam channel. A dedicated OS
//! thread drains the channel and calls the subscribers one after another, in
//! registration order. Subscribers therefore never overlap for one event and
//! never hold up result frames behind them.

use crate::core::codec::EventFrame;
use crate::traits::EventSubscriber;
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

type SharedSubscriber = Arc<Mutex<Box<dyn EventSubscriber>>>;

pub struct EventFanout {
    subscribers: Arc<Mutex<Vec<SharedSubscriber>>>,
    sender: Mutex<Option<Sender<EventFrame>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    dispatched: Arc<AtomicU64>,
}

impl EventFanout {
    /// Create the fan-out and start its dispatcher thread
    pub fn new() -> Self {
        let subscribers: Arc<Mutex<Vec<SharedSubscriber>>> = Arc::new(Mutex::new(Vec::new()));
        let dispatched = Arc::new(AtomicU64::new(0));
        let (sender, receiver) = unbounded::<EventFrame>();

        let handle = {
            let subscribers = Arc::clone(&subscribers);
            let dispatched = Arc::clone(&dispatched);

            std::thread::Builder::new()
                .name("hub-event-dispatch".into())
                .spawn(move || {
                    for frame in receiver.iter() {
                        // Snapshot so a subscriber may register others while running.
                        let snapshot: Vec<SharedSubscriber> = subscribers.lock().clone();

                        for (index, subscriber) in snapshot.iter().enumerate() {
                            if let Err(e) = subscriber.lock().handle(&frame) {
                                error!(
                                    subscriber = index,
                                    event_type = %frame.event.event_type,
                                    "Subscriber error: {}",
                                    e
                                );
                            }
                        }

                        dispatched.fetch_add(1, Ordering::Release);
                    }
                    debug!("Event channel closed, dispatcher thread exiting");
                })
                .ok()
        };

        if handle.is_none() {
            error!("Failed to spawn event dispatcher thread; events will be dropped");
        }

        Self {
            subscribers,
            sender: Mutex::new(handle.as_ref().map(|_| sender)),
            dispatcher: Mutex::new(handle),
            dispatched,
        }
    }

    /// Register a subscriber; it sees every event published afterwards
    pub fn subscribe(&self, subscriber: impl EventSubscriber) {
        let boxed: Box<dyn EventSubscriber> = Box::new(subscriber);
        let mut subscribers = self.subscribers.lock();
        subscribers.push(Arc::new(Mutex::new(boxed)));
        debug!(subscribers = subscribers.len(), "Event subscriber registered");
    }

    /// Queue an event for dispatch (never blocks)
    pub fn publish(&self, frame: EventFrame) {
        if let Some(sender) = self.sender.lock().as_ref() {
            // Only fails once the dispatcher is gone, i.e. during shutdown.
            let _ = sender.send(frame);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Number of events fully delivered to all subscribers
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Stop accepting events, let the dispatcher drain, and join it
    pub fn close(&self) {
        drop(self.sender.lock().take());

        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                error!("Event dispatcher thread panicked");
            }
        }
    }
}

impl Default for EventFanout {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventFanout {
    fn drop(&mut self) {
        // Detach rather than join: the last owner may be an async task.
        drop(self.sender.lock().take());
    }
}
