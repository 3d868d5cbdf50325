//! Lock-free connection state and counters
//!
//! The supervisor task is the only writer of the handshake state; callers read
//! it through atomics without ever taking a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Handshake state of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// No socket (connecting, or waiting for the reconnect delay)
    Disconnected = 0,
    /// Socket open, hub has not challenged yet
    Unauthenticated = 1,
    /// Credentials sent, waiting for `auth_ok`
    AuthSent = 2,
    /// Requests are accepted
    Ready = 3,
    /// The connection was shut down and will not reconnect
    ShuttingDown = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Unauthenticated,
            2 => ConnectionState::AuthSent,
            3 => ConnectionState::Ready,
            4 => ConnectionState::ShuttingDown,
            _ => ConnectionState::Disconnected,
        }
    }
}

#[derive(Debug)]
pub struct AtomicConnectionState {
    state: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.get() == ConnectionState::Ready
    }
}

/// Subscription state of the current session (`None → Subscribed`)
#[derive(Debug, Default)]
pub struct AtomicSubscriptionState {
    subscribed: AtomicBool,
}

impl AtomicSubscriptionState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_subscribed(&self, subscribed: bool) {
        self.subscribed.store(subscribed, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct AtomicMetrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_handshake_states_round_trip_through_atomic() {
        let state = AtomicConnectionState::new(ConnectionState::Disconnected);
        for next in [
            ConnectionState::Unauthenticated,
            ConnectionState::AuthSent,
            ConnectionState::Ready,
            ConnectionState::ShuttingDown,
            ConnectionState::Disconnected,
        ] {
            state.set(next);
            assert_eq!(state.get(), next);
        }
    }

    #[test]
    fn test_only_ready_is_ready() {
        let state = AtomicConnectionState::new(ConnectionState::AuthSent);
        assert!(!state.is_ready());
        state.set(ConnectionState::Ready);
        assert!(state.is_ready());
    }

    #[test]
    fn test_metrics_concurrent_increments() {
        let metrics = Arc::new(AtomicMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.increment_sent();
                        metrics.increment_received();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.frames_sent(), 4000);
        assert_eq!(metrics.frames_received(), 4000);
        assert_eq!(metrics.reconnect_count(), 0);
    }
}
