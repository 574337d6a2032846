//! Consumer-side stream control.
//!
//! The transfer engine driver is a dumb pump: it pulls blocks with
//! [`Consumer::next`](crate::pipeline::Consumer::next) and stops when handed
//! `None`. [`StreamControl`] tracks whether the stream is supposed to be
//! running, turns the first empty pull into a single underrun transition,
//! and emits exactly one started/stopped notification per transition no
//! matter how often the driver polls.
//!
//! ```text
//! Stopped ──start()──► Streaming ──on_underrun()──► Underrun
//!    ▲                     │                           │
//!    └──────── stop() ◄────┴───────────────────────────┘
//! ```
//!
//! `stop()` also forces the pipeline through [`pipeline::reset`], so a
//! stopped stream always restarts from an empty, below-threshold state.

use crate::pipeline::{self, Consumer, Producer};

/// Stream lifecycle notifications delivered to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// The transfer engine was started.
    Started,
    /// The stream was stopped (explicitly or after an underrun). Emitted
    /// once per stop.
    Stopped,
}

/// Stream event callback. A plain `fn`, callable from interrupt context.
pub type StreamEventHandler = fn(StreamEvent);

/// Consumer-side transfer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Transfer engine idle; waiting for the watermark and a start decision.
    Stopped,
    /// Transfer engine running, pulling blocks.
    Streaming,
    /// The drain path found the ready queue empty; the engine is winding
    /// down and the stream is about to be stopped.
    Underrun,
}

/// Tracks the transfer engine's run state and deduplicates notifications.
pub struct StreamControl {
    state: StreamState,
    handler: StreamEventHandler,
}

impl StreamControl {
    pub const fn new(handler: StreamEventHandler) -> Self {
        StreamControl {
            state: StreamState::Stopped,
            handler,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Begin streaming. This is the application's start decision, typically taken
    /// on [`BufferEvent::LowWatermarkCrossedUp`](crate::pipeline::BufferEvent).
    ///
    /// Fires [`StreamEvent::Started`] and returns `true` on the
    /// `Stopped → Streaming` transition; `false` (no event) otherwise.
    pub fn start(&mut self) -> bool {
        if self.state != StreamState::Stopped {
            return false;
        }
        self.state = StreamState::Streaming;
        log::info!("audio stream started");
        (self.handler)(StreamEvent::Started);
        true
    }

    /// Record that the drain path was handed `None`. Only the first empty
    /// pull of a running stream transitions to [`StreamState::Underrun`];
    /// repeated polls are absorbed.
    pub fn on_underrun(&mut self) {
        if self.state == StreamState::Streaming {
            log::debug!("stream underrun");
            self.state = StreamState::Underrun;
        }
    }

    /// Stop the stream: reset the pipeline, transition to
    /// [`StreamState::Stopped`] and fire a single [`StreamEvent::Stopped`].
    /// A no-op when already stopped.
    pub fn stop(&mut self, producer: &mut Producer<'_>, consumer: &mut Consumer<'_>) {
        if self.state == StreamState::Stopped {
            return;
        }
        pipeline::reset(producer, consumer);
        self.state = StreamState::Stopped;
        log::info!("audio stream stopped");
        (self.handler)(StreamEvent::Stopped);
    }
}
