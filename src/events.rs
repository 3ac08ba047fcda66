//! Event Bus: the four unsolicited notifications the driver publishes.
//!
//! Handlers run synchronously on the driver actor's task, in registration
//! order. A handler that blocks stalls the whole driver, so handlers are
//! expected to hand off any real work (e.g. over their own channel).

/// An event published by the driver.
#[derive(Debug, Clone)]
pub enum Event {
    /// The init sequence (§4.5.3) completed successfully.
    Initialized,
    /// An `SBDRING` line arrived. The application decides whether to poll
    /// the mailbox; the driver issues no command on its own.
    RingAlert,
    /// A mobile-terminated message was read during a mailbox check.
    NewMessage { payload: Vec<u8>, mtqueued: u32 },
    /// Raw AT traffic, only emitted when `Config::debug` is set.
    Debug(String),
}

pub(crate) type Handler = Box<dyn FnMut(&Event) + Send + 'static>;

/// Ordered collection of event handlers, invoked in registration order.
#[derive(Default)]
pub(crate) struct EventBus {
    handlers: Vec<Handler>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub(crate) fn with_handlers(handlers: Vec<Handler>) -> Self {
        Self { handlers }
    }

    pub(crate) fn subscribe(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    pub(crate) fn publish(&mut self, event: Event) {
        for handler in &mut self.handlers {
            handler(&event);
        }
    }
}
