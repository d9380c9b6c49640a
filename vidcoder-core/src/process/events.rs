//! Typed publish/subscribe channels for a running process.
//!
//! A channel has one producer (the thread pumping the child's stderr) and any
//! number of handlers. Handlers run synchronously, in subscription order, and
//! may detach themselves from inside their own invocation through the
//! [`Subscription`] they are handed. Emission needs `&mut self`, so the
//! handler list can never be iterated and modified at the same time.

use std::fmt;
use std::time::Duration;

/// One decoded progress record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressTick {
    /// Frames written so far.
    pub frame: u64,
    /// Output time processed so far, in seconds.
    pub processed_secs: f64,
    pub fps: f64,
    /// Speed as reported by ffmpeg (`speed=1.5x`).
    pub reported_speed: f64,
    /// Wall-clock time since the process was started.
    pub elapsed: Duration,
}

/// Identifies a handler for [`EventChannel::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Handed to every handler call; lets the handler remove itself.
#[derive(Debug, Default)]
pub struct Subscription {
    detached: bool,
}

impl Subscription {
    /// Removes the current handler once this invocation returns.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }
}

type Handler<T> = Box<dyn FnMut(&T, &mut Subscription) + Send>;

/// An ordered list of handlers for events of type `T`.
pub struct EventChannel<T> {
    handlers: Vec<(HandlerId, Handler<T>)>,
    next_id: u64,
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&T, &mut Subscription) + Send + 'static,
    {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns false if the handler was already gone.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Delivers `event` to every handler, dropping the ones that detached.
    pub fn emit(&mut self, event: &T) {
        self.handlers.retain_mut(|(_, handler)| {
            let mut subscription = Subscription::default();
            handler(event, &mut subscription);
            !subscription.detached
        });
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
