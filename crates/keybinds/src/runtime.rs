//! Seam to the embedded scripting runtime.
//!
//! The dispatcher never touches script objects directly. Everything that
//! crosses into the runtime goes through [`ScriptRuntime`], and callback
//! failures come back as a [`Fault`] value instead of unwinding across the
//! boundary.

use std::fmt;

use keyname::EventKind;
use tracing::{error, warn};

use crate::registry::Binding;

/// Where a callback failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Raised by the callback's own scripted logic.
    Script,
    /// Anything else: a host-side error or a panic while invoking.
    Host,
}

/// A failed callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Origin of the failure.
    pub kind: FaultKind,
    /// Human-readable detail (script traceback, panic payload, ...).
    pub detail: String,
}

impl Fault {
    /// A failure raised by scripted logic.
    pub fn script(detail: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Script,
            detail: detail.into(),
        }
    }

    /// An unexpected host-side failure.
    pub fn host(detail: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Host,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FaultKind::Script => write!(f, "script error: {}", self.detail),
            FaultKind::Host => write!(f, "host error: {}", self.detail),
        }
    }
}

/// The embedded scripting runtime, as seen by the dispatcher.
///
/// Implementations wrap the host's interpreter. All methods other than
/// [`ScriptRuntime::lock`] must only be called while a guard returned by
/// `lock` is alive on the calling thread.
pub trait ScriptRuntime: Send + Sync + 'static {
    /// A script-visible value (argument or return value).
    type Value;
    /// An owned reference to a script callable.
    type Callable: Send + Sync;
    /// Scoped ownership of the runtime's global lock.
    type Guard<'a>
    where
        Self: 'a;

    /// Acquire the runtime's global serialization lock.
    ///
    /// Must be reentrant for the owning thread: callbacks run with the lock
    /// held and may call back into the binding API, which locks again.
    fn lock(&self) -> Self::Guard<'_>;

    /// Build the script-visible representation of `kind`.
    fn event_value(&self, kind: EventKind) -> Result<Self::Value, Fault>;

    /// Invoke `callable` with `arg` as its sole argument, or with no
    /// arguments when `arg` is `None`.
    fn call(&self, callable: &Self::Callable, arg: Option<&Self::Value>)
    -> Result<Self::Value, Fault>;

    /// True if `value` is the block sentinel type or an instance of it.
    fn is_block_sentinel(&self, value: &Self::Value) -> bool;
}

/// Log a failed callback with enough context to find the binding it came from.
pub fn log_fault<C>(binding: &Binding<C>, fault: &Fault) {
    let key = binding.key();
    let handle = binding.handle();
    let filter = binding.filter().map(|k| k.to_spec());
    match fault.kind {
        FaultKind::Script => warn!(
            %key,
            %handle,
            ?filter,
            detail = %fault.detail,
            "keybind_callback_script_error"
        ),
        FaultKind::Host => error!(
            %key,
            %handle,
            ?filter,
            detail = %fault.detail,
            "keybind_callback_host_error"
        ),
    }
}
