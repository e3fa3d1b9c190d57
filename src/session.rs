//! Live radio sessions.
//!
//! A [`Session`] owns the event registry for one connected endpoint. The
//! link feeding it is any `mpsc` channel of [`Event`]s; a background pump
//! publishes each one through the session's [`EventDispatcher`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::event::{Event, EventDispatcher, Topic};
use crate::transport::Endpoint;
use crate::types::Packet;

/// Handle to the active session, passed to packet callbacks.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    endpoint: Endpoint,
}

impl SessionHandle {
    /// Returns the endpoint the session is connected to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// An established connection to one endpoint.
pub struct Session {
    handle: SessionHandle,
    events: EventDispatcher,
    pump: Option<JoinHandle<()>>,
    handlers: Vec<JoinHandle<()>>,
}

impl Session {
    /// Creates a session publishing every event received on `link`.
    ///
    /// The session reports itself closed once every sender of `link` is
    /// dropped.
    #[must_use]
    pub fn from_events(endpoint: Endpoint, capacity: usize, mut link: mpsc::Receiver<Event>) -> Self {
        let events = EventDispatcher::new(capacity);

        let dispatcher = events.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = link.recv().await {
                dispatcher.dispatch(event);
            }
            tracing::debug!("session link closed");
            dispatcher.dispatch(Event::Disconnected);
        });

        Self {
            handle: SessionHandle { endpoint },
            events,
            pump: Some(pump),
            handlers: Vec::new(),
        }
    }

    /// Returns the endpoint this session is connected to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.handle.endpoint
    }

    /// Returns the event registry.
    #[must_use]
    pub const fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Registers `handler` for every packet received during the session.
    pub fn on_receive<F>(&mut self, handler: F)
    where
        F: Fn(&Packet, &SessionHandle) + Send + 'static,
    {
        let handle = self.handle.clone();
        let task = self.events.on(Topic::RECEIVE, move |event| {
            if let Event::Packet(packet) = event {
                handler(packet, &handle);
            }
        });
        self.handlers.push(task);
    }

    /// Waits until the link ends and returns the reason.
    pub async fn closed(&mut self) -> Error {
        let Some(pump) = self.pump.as_mut() else {
            return Error::Disconnected;
        };
        let result = pump.await;
        self.pump = None;

        match result {
            Ok(()) => Error::Disconnected,
            Err(e) => Error::connection(e),
        }
    }

    /// Stops the session after every handler has seen the events already
    /// published.
    pub async fn finish(mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
        }
        let handlers = std::mem::take(&mut self.handlers);
        drop(self);

        for handler in handlers {
            let _ = handler.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.pump.take() {
            task.abort();
        }
        for task in self.handlers.drain(..) {
            task.abort();
        }
    }
}
