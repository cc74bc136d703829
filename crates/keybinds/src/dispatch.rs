//! The binding API and the dispatch algorithm.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    result::Result as StdResult,
};

use keyname::{EventKind, KeyName};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    Error, Handle, InputGuard, InputKeyParams, ObjectPtr, Result,
    registry::{Binding, Registry},
    runtime::{Fault, ScriptRuntime, log_fault},
};

/// Read-only view of one registered binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingInfo {
    /// Key the binding listens on.
    pub key: KeyName,
    /// Event kind filter, if any.
    pub filter: Option<EventKind>,
    /// Registration handle.
    pub handle: Handle,
}

impl<C> From<&Binding<C>> for BindingInfo {
    fn from(b: &Binding<C>) -> Self {
        Self {
            key: b.key(),
            filter: b.filter(),
            handle: b.handle(),
        }
    }
}

/// Render a panic payload for logs.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a runtime call, turning a panic into a host fault.
fn contain<T>(f: impl FnOnce() -> StdResult<T, Fault>) -> StdResult<T, Fault> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(Fault::host(panic_message(payload.as_ref()))))
}

/// Registered key bindings plus everything needed to run them.
///
/// Construct once per process with [`Keybinds::new`], share it (usually in an
/// `Arc`) between the binding API and the hook shim, and feed native events to
/// [`Keybinds::dispatch`].
pub struct Keybinds<R: ScriptRuntime> {
    /// Scripting runtime that owns the callables.
    runtime: R,
    /// Host-state guard consulted before running callbacks.
    guard: Box<dyn InputGuard>,
    /// Binding storage. Held only for short sections, never across a callback.
    registry: Mutex<Registry<R::Callable>>,
}

impl<R: ScriptRuntime> Keybinds<R> {
    /// Create an empty binding set.
    pub fn new(runtime: R, guard: impl InputGuard + 'static) -> Self {
        Self {
            runtime,
            guard: Box::new(guard),
            registry: Mutex::new(Registry::new()),
        }
    }

    /// The scripting runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Register `callback` for `key`.
    ///
    /// With `filter` set, the callback fires only for that event kind and is
    /// called with no arguments. Without it, the callback fires for every kind
    /// and receives the kind as its argument. Always succeeds.
    pub fn register(
        &self,
        key: KeyName,
        filter: Option<EventKind>,
        callback: R::Callable,
    ) -> Handle {
        let _rt = self.runtime.lock();
        let handle = self.registry.lock().insert(key, filter, callback);
        debug!(%key, %handle, filter = ?filter.map(EventKind::to_spec), "keybind_registered");
        handle
    }

    /// Remove the binding for `handle`. Unknown or stale handles are ignored.
    pub fn deregister(&self, handle: Handle) {
        let _rt = self.runtime.lock();
        // Declared after `_rt` so the callable is released under the runtime lock.
        let removed = self.registry.lock().remove_by_handle(handle);
        match &removed {
            Some(b) => debug!(key = %b.key(), %handle, "keybind_deregistered"),
            None => trace!(%handle, "keybind_deregister_unknown_handle"),
        }
    }

    /// Remove a binding by the raw handle value scripts hold. Zero is ignored.
    pub fn deregister_raw(&self, raw: u64) {
        match Handle::from_raw(raw) {
            Some(h) => self.deregister(h),
            None => trace!(raw, "keybind_deregister_invalid_handle"),
        }
    }

    /// Remove every binding for `key`.
    ///
    /// For recovery only, when a handle has been lost.
    pub fn deregister_all_for_key(&self, key: KeyName) {
        let _rt = self.runtime.lock();
        let removed = self.registry.lock().remove_by_key(key);
        debug!(%key, count = removed.len(), "keybind_deregistered_key");
    }

    /// Remove every binding.
    ///
    /// For recovery only, when a handle has been lost.
    pub fn deregister_all(&self) {
        let _rt = self.runtime.lock();
        let removed = self.registry.lock().clear();
        debug!(count = removed.len(), "keybind_deregistered_all");
    }

    /// Bindings currently registered for `key`, oldest first.
    pub fn bindings_for(&self, key: KeyName) -> Vec<BindingInfo> {
        self.registry
            .lock()
            .lookup(key)
            .iter()
            .map(|b| BindingInfo::from(b.as_ref()))
            .collect()
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    /// Run the bindings matching one native input call.
    ///
    /// Returns `Ok(true)` if at least one callback asked to block the event.
    /// Callback failures are logged and skipped; an `Err` means dispatch
    /// itself failed (the guard could not read host state, or the event kind
    /// could not be converted for the runtime) and the caller should let the
    /// event through.
    pub fn dispatch(&self, receiver: ObjectPtr, params: &InputKeyParams) -> Result<bool> {
        let key = params.key;
        let kind = params.event;

        // Almost every native event matches nothing; keep this path cheap.
        if !self.registry.lock().has_match(key, kind) {
            return Ok(false);
        }

        if self.guard.suppress(receiver)? {
            trace!(%key, %kind, "keybind_guard_suppressed");
            return Ok(false);
        }

        let _rt = self.runtime.lock();

        // Everything below is dropped before `_rt`, so releasing the last
        // reference to a callable or the event value happens under the lock.
        let snapshot = self.registry.lock().snapshot(key, kind);
        let mut event_value = None;
        let mut should_block = false;

        trace!(%key, %kind, count = snapshot.len(), "keybind_dispatch");

        for binding in &snapshot {
            let arg = match binding.filter() {
                Some(_) => None,
                None => {
                    if event_value.is_none() {
                        // Not a callback fault: abandon the whole event.
                        let value = contain(|| self.runtime.event_value(kind))
                            .map_err(|fault| Error::EventValue(fault.to_string()))?;
                        event_value = Some(value);
                    }
                    event_value.as_ref()
                }
            };

            let ret = contain(|| {
                self.runtime
                    .call(binding.callback(), arg)
                    .map(|value| self.runtime.is_block_sentinel(&value))
            });

            match ret {
                Ok(true) => {
                    trace!(%key, handle = %binding.handle(), "keybind_block_requested");
                    should_block = true;
                }
                Ok(false) => {}
                Err(fault) => log_fault(binding, &fault),
            }
        }

        Ok(should_block)
    }
}
