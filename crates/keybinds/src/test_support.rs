//! Test support utilities for keybinds unit and integration tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.
//! They stand in for the scripting runtime and the host-side hook machinery.

use std::{
    fmt,
    result::Result as StdResult,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use keyname::EventKind;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use crate::{
    DetourInstaller, Error, Fault, InputGuard, InputKeyFn, InputKeyParams, NativeAddr, ObjectPtr,
    Pattern, PatternScanner, Result, ScriptRuntime,
};

/// Values passed to and returned from mock callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockValue {
    /// No value.
    None,
    /// An instance of the block sentinel.
    Block,
    /// The block sentinel type itself.
    BlockType,
    /// Any other value.
    Int(i64),
    /// Script-side event kind.
    Event(EventKind),
    /// A value whose sentinel check panics.
    PanicOnInspect,
}

/// Signature of a mock callback body.
type CallbackFn = dyn Fn(Option<&MockValue>) -> StdResult<MockValue, Fault> + Send + Sync;

/// A callable owned by [`MockRuntime`].
#[derive(Clone)]
pub struct MockCallable(Arc<CallbackFn>);

impl MockCallable {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&MockValue>) -> StdResult<MockValue, Fault> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A callable that always returns `value`.
    pub fn returning(value: MockValue) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }
}

impl fmt::Debug for MockCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MockCallable")
    }
}

/// In-process stand-in for the scripting runtime.
#[derive(Default)]
pub struct MockRuntime {
    /// The global, reentrant runtime lock.
    lock: ReentrantMutex<()>,
    /// Number of `lock` calls.
    locks: AtomicUsize,
    /// Number of event values built.
    event_values: AtomicUsize,
    /// Calls or conversions made without the lock held.
    unlocked: AtomicUsize,
    /// Make `event_value` fail.
    fail_event_value: AtomicBool,
}

impl MockRuntime {
    /// Create a runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the lock was taken.
    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    /// How many event values were built.
    pub fn event_value_count(&self) -> usize {
        self.event_values.load(Ordering::SeqCst)
    }

    /// Runtime entries made while the lock was not held.
    pub fn unlocked_calls(&self) -> usize {
        self.unlocked.load(Ordering::SeqCst)
    }

    /// Make building the event value fail.
    pub fn set_fail_event_value(&self, fail: bool) {
        self.fail_event_value.store(fail, Ordering::SeqCst);
    }

    /// Record a runtime entry made without the lock.
    fn check_locked(&self) {
        if !self.lock.is_locked() {
            self.unlocked.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ScriptRuntime for MockRuntime {
    type Value = MockValue;
    type Callable = MockCallable;
    type Guard<'a> = ReentrantMutexGuard<'a, ()>;

    fn lock(&self) -> Self::Guard<'_> {
        self.locks.fetch_add(1, Ordering::SeqCst);
        self.lock.lock()
    }

    fn event_value(&self, kind: EventKind) -> StdResult<MockValue, Fault> {
        self.check_locked();
        self.event_values.fetch_add(1, Ordering::SeqCst);
        if self.fail_event_value.load(Ordering::SeqCst) {
            return Err(Fault::host("enum conversion failed"));
        }
        Ok(MockValue::Event(kind))
    }

    fn call(
        &self,
        callable: &MockCallable,
        arg: Option<&MockValue>,
    ) -> StdResult<MockValue, Fault> {
        self.check_locked();
        (callable.0)(arg)
    }

    fn is_block_sentinel(&self, value: &MockValue) -> bool {
        if *value == MockValue::PanicOnInspect {
            panic!("mock sentinel check panic");
        }
        matches!(value, MockValue::Block | MockValue::BlockType)
    }
}

/// Guard with switchable behaviour.
#[derive(Default)]
pub struct MockGuard {
    /// Shared switches, so a clone can flip them after the guard is moved.
    state: Arc<GuardState>,
}

/// Switches behind a [`MockGuard`].
#[derive(Default)]
struct GuardState {
    /// Report "in a menu".
    suppress: AtomicBool,
    /// Return an error.
    fail: AtomicBool,
    /// Panic.
    panic: AtomicBool,
}

impl MockGuard {
    /// A guard that lets everything run.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle sharing this guard's switches.
    pub fn handle(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }

    /// Suppress callbacks.
    pub fn set_suppress(&self, v: bool) {
        self.state.suppress.store(v, Ordering::SeqCst);
    }

    /// Fail the guard check.
    pub fn set_fail(&self, v: bool) {
        self.state.fail.store(v, Ordering::SeqCst);
    }

    /// Panic in the guard check.
    pub fn set_panic(&self, v: bool) {
        self.state.panic.store(v, Ordering::SeqCst);
    }
}

impl InputGuard for MockGuard {
    fn suppress(&self, _receiver: ObjectPtr) -> Result<bool> {
        if self.state.panic.load(Ordering::SeqCst) {
            panic!("mock guard panic");
        }
        if self.state.fail.load(Ordering::SeqCst) {
            return Err(Error::Guard("mock guard failure".into()));
        }
        Ok(self.state.suppress.load(Ordering::SeqCst))
    }
}

/// Scanner that reports a fixed result and records what it was asked.
pub struct MockScanner {
    /// Address to report.
    addr: Option<NativeAddr>,
    /// Patterns searched for.
    searched: Mutex<Vec<Pattern>>,
}

impl MockScanner {
    /// A scanner that finds every pattern at `addr`.
    pub fn at(addr: NativeAddr) -> Self {
        Self {
            addr: Some(addr),
            searched: Mutex::new(Vec::new()),
        }
    }

    /// A scanner that finds nothing.
    pub fn missing() -> Self {
        Self {
            addr: None,
            searched: Mutex::new(Vec::new()),
        }
    }

    /// Patterns searched for so far.
    pub fn searched(&self) -> Vec<Pattern> {
        self.searched.lock().clone()
    }
}

impl PatternScanner for MockScanner {
    fn find(&self, pattern: &Pattern) -> Option<NativeAddr> {
        self.searched.lock().push(pattern.clone());
        self.addr
    }
}

/// Stand-in for the unpatched native function.
pub struct RecordingOriginal {
    /// Value returned from every call.
    ret: usize,
    /// Calls received.
    calls: Mutex<Vec<(ObjectPtr, InputKeyParams)>>,
}

impl RecordingOriginal {
    /// An original that returns `ret`.
    pub fn new(ret: usize) -> Self {
        Self {
            ret,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<(ObjectPtr, InputKeyParams)> {
        self.calls.lock().clone()
    }
}

impl InputKeyFn for RecordingOriginal {
    fn call(&self, receiver: ObjectPtr, params: &InputKeyParams) -> usize {
        self.calls.lock().push((receiver, params.clone()));
        self.ret
    }
}

/// Detour installer that patches nothing but routes [`MockInstaller::fire`]
/// through whatever detour was installed.
pub struct MockInstaller {
    /// The function being "patched".
    original: Arc<RecordingOriginal>,
    /// Installed target and detour.
    installed: Mutex<Option<(NativeAddr, Arc<dyn InputKeyFn>)>>,
    /// Reject installs.
    fail: AtomicBool,
}

impl MockInstaller {
    /// An installer whose original function returns `original_ret`.
    pub fn new(original_ret: usize) -> Self {
        Self {
            original: Arc::new(RecordingOriginal::new(original_ret)),
            installed: Mutex::new(None),
            fail: AtomicBool::new(false),
        }
    }

    /// Reject future installs.
    pub fn set_fail(&self, v: bool) {
        self.fail.store(v, Ordering::SeqCst);
    }

    /// The original function.
    pub fn original(&self) -> &Arc<RecordingOriginal> {
        &self.original
    }

    /// True once a detour has been installed.
    pub fn is_installed(&self) -> bool {
        self.installed.lock().is_some()
    }

    /// Address a detour was installed at.
    pub fn target(&self) -> Option<NativeAddr> {
        self.installed.lock().as_ref().map(|(a, _)| *a)
    }

    /// Simulate the host calling the patched function. `None` if nothing is
    /// installed.
    pub fn fire(&self, receiver: ObjectPtr, params: &InputKeyParams) -> Option<usize> {
        let detour = self.installed.lock().as_ref().map(|(_, d)| d.clone())?;
        Some(detour.call(receiver, params))
    }
}

impl DetourInstaller for MockInstaller {
    fn install(
        &self,
        target: NativeAddr,
        detour: Arc<dyn InputKeyFn>,
        name: &str,
    ) -> Result<Arc<dyn InputKeyFn>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Detour {
                name: name.to_string(),
                reason: "mock installer rejected target".into(),
            });
        }
        *self.installed.lock() = Some((target, detour));
        let original: Arc<dyn InputKeyFn> = self.original.clone();
        Ok(original)
    }
}
