//! Streaming invocation results.
//!
//! A streaming invocation yields zero or more [`InvocationEvent::Partial`]
//! payloads followed by exactly one [`InvocationEvent::Final`]. Consumers
//! that only want the answer use [`drain`].

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use super::invocation::{FailureKind, InvocationResult};

/// One item of a streaming invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationEvent {
    /// Intermediate payload; not validated against the result schema.
    Partial(Value),
    /// Terminal outcome. Nothing follows it.
    Final(InvocationResult),
}

impl InvocationEvent {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final(_))
    }
}

/// Lazy sequence of invocation events.
pub type InvocationStream = Pin<Box<dyn Stream<Item = InvocationEvent> + Send>>;

/// A stream holding only the given terminal result.
pub fn single(result: InvocationResult) -> InvocationStream {
    stream::once(async move { InvocationEvent::Final(result) }).boxed()
}

// ---------------------------------------------------------------------------
// StreamAccumulator
// ---------------------------------------------------------------------------

/// Collects the events of a stream and keeps its terminal result.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    partials: Vec<Value>,
    terminal: Option<InvocationResult>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event. Returns `true` once the terminal event has been seen.
    pub fn push(&mut self, event: InvocationEvent) -> bool {
        match event {
            InvocationEvent::Partial(value) => {
                if self.terminal.is_none() {
                    self.partials.push(value);
                }
            }
            InvocationEvent::Final(result) => {
                if self.terminal.is_none() {
                    self.terminal = Some(result);
                }
            }
        }
        self.terminal.is_some()
    }

    pub fn partials(&self) -> &[Value] {
        &self.partials
    }

    /// The terminal result; a stream that ended early is a transport failure.
    pub fn finish(self) -> InvocationResult {
        self.terminal.unwrap_or_else(|| {
            InvocationResult::failure(
                FailureKind::Transport,
                format!(
                    "stream ended after {} partial result(s) without a final result",
                    self.partials.len()
                ),
            )
        })
    }
}

/// Consume a stream and return its terminal result.
pub async fn drain(mut stream: InvocationStream) -> InvocationResult {
    let mut acc = StreamAccumulator::new();
    while let Some(event) = stream.next().await {
        if acc.push(event) {
            break;
        }
    }
    acc.finish()
}
