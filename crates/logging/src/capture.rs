//! Capture tracing events into a bounded in-memory buffer.
//!
//! Install [`Capture::layer`] in a subscriber and read the recorded events
//! back with [`Capture::drain`] or [`Capture::snapshot`]. The buffer keeps the
//! most recent `capacity` events and counts the ones it had to drop.
//!
//! ```ignore
//! let capture = Capture::new(256);
//! let subscriber = tracing_subscriber::registry().with(capture.layer());
//! tracing::subscriber::with_default(subscriber, || run());
//! for log in capture.drain() { println!("{log}"); }
//! ```

use std::{collections::VecDeque, sync::Arc};

use logfmt::{RenderedLog, render_event};
use parking_lot::Mutex;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Shared state behind a [`Capture`] and its layers.
#[derive(Debug)]
struct Buffer {
    /// Recorded events, oldest first.
    logs: VecDeque<RenderedLog>,
    /// Maximum number of retained events.
    capacity: usize,
    /// Events evicted because the buffer was full.
    dropped: u64,
}

/// Handle to a bounded buffer of captured events.
///
/// Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct Capture {
    /// The buffer.
    inner: Arc<Mutex<Buffer>>,
    /// Events less severe than this are ignored.
    min_level: Level,
}

impl Capture {
    /// A capture retaining at most `capacity` events of any level.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Buffer {
                logs: VecDeque::with_capacity(capacity.min(1024)),
                capacity: capacity.max(1),
                dropped: 0,
            })),
            min_level: Level::TRACE,
        }
    }

    /// Only record events at `level` or more severe.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// A tracing layer feeding this buffer.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer {
            capture: self.clone(),
        }
    }

    /// Copy of the recorded events, oldest first.
    pub fn snapshot(&self) -> Vec<RenderedLog> {
        self.inner.lock().logs.iter().cloned().collect()
    }

    /// Take the recorded events, leaving the buffer empty.
    pub fn drain(&self) -> Vec<RenderedLog> {
        self.inner.lock().logs.drain(..).collect()
    }

    /// Recorded events named `message`.
    pub fn find(&self, message: &str) -> Vec<RenderedLog> {
        self.inner
            .lock()
            .logs
            .iter()
            .filter(|r| r.message == message)
            .cloned()
            .collect()
    }

    /// Number of events evicted so far.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    /// Record one rendered event.
    fn push(&self, log: RenderedLog) {
        let mut buf = self.inner.lock();
        if buf.logs.len() >= buf.capacity {
            buf.logs.pop_front();
            buf.dropped += 1;
        }
        buf.logs.push_back(log);
    }
}

/// Tracing layer that records events into a [`Capture`].
#[derive(Debug, Clone)]
pub struct CaptureLayer {
    /// Destination buffer.
    capture: Capture,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // Level ordering: ERROR < WARN < ... < TRACE.
        if *event.metadata().level() > self.capture.min_level {
            return;
        }
        self.capture.push(render_event(event));
    }
}
