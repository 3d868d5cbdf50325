//! Event subscribers
//!
//! Push events from the hub are delivered to every registered subscriber in
//! registration order. All subscribers run on one dedicated dispatcher thread:
//!
//! ```text
//! Receive loop → event frame → crossbeam channel → Dispatcher thread
//!                                                     ├─ subscriber #0
//!                                                     ├─ subscriber #1
//!                                                     └─ subscriber #N
//! ```
//!
//! # Ordering Guarantees
//!
//! - Events are seen in hub-emission order by every subscriber
//! - For one event, subscriber #0 returns before subscriber #1 is called
//! - Dispatch never blocks the receive loop, so request/response traffic keeps
//!   flowing while subscribers work

use crate::core::codec::EventFrame;
use crate::error::Result;

/// Subscriber invoked for every tracked push event
///
/// # Example
///
/// ```ignore
/// struct MotionAlert {
///     notify: Sender<String>,
/// }
///
/// impl EventSubscriber for MotionAlert {
///     fn handle(&mut self, frame: &EventFrame) -> Result<()> {
///         if let Some(change) = frame.event.state_change()? {
///             if change.entity_id == "binary_sensor.entrance_motion"
///                 && change.new_state.as_ref().map(|s| s.state.as_str()) == Some("on")
///             {
///                 let _ = self.notify.send("Motion at the entrance".into());
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait EventSubscriber: Send + 'static {
    /// Handle one push event
    ///
    /// Runs on the dispatcher thread, not in an async context. Errors are
    /// logged and the next subscriber still runs.
    fn handle(&mut self, frame: &EventFrame) -> Result<()>;
}

impl<F> EventSubscriber for F
where
    F: FnMut(&EventFrame) + Send + 'static,
{
    fn handle(&mut self, frame: &EventFrame) -> Result<()> {
        self(frame);
        Ok(())
    }
}
