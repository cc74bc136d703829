//! A simulated host: an executable image to scan, a patchable input handler,
//! menu state, and a toy scripting runtime driving the callbacks.

use std::{
    fmt, panic,
    result::Result as StdResult,
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use keybinds::{
    DetourInstaller, Error, Fault, Handle, InputKeyFn, InputKeyParams, Keybinds, MenuGuard,
    NativeAddr, ObjectPtr, Pattern, PatternScanner, Result, ScriptRuntime,
};
use keyname::EventKind;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, trace};

use crate::scenario::Action;

/// Address the simulated image is loaded at.
pub const IMAGE_BASE: usize = 0x1_4000_0000;

/// The player-input object the host delivers key events to.
pub const PLAYER: ObjectPtr = ObjectPtr::new(0x7ff6_0000_1000);

/// Byte used for code around the hooked function and for wildcard bytes.
const FILLER: u8 = 0xCC;

/// Offset of the hooked function within the image.
const FUNCTION_OFFSET: usize = 0x2340;

/// Values crossing the simulated script boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimValue {
    /// No value.
    None,
    /// The block sentinel.
    Block,
    /// An ordinary integer.
    Int(i64),
    /// Script-side event kind.
    Event(EventKind),
}

impl fmt::Display for SimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Block => f.write_str("BlockInput"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Event(kind) => write!(f, "EInputEvent.{kind}"),
        }
    }
}

/// A simulated script callable.
#[derive(Debug)]
pub struct SimCallable {
    /// What the callable does.
    action: Action,
    /// Binding set, for callables that remove themselves.
    keybinds: Weak<Keybinds<SimRuntime>>,
    /// Own handle, set once registration returns.
    handle: Arc<OnceLock<Handle>>,
}

impl SimCallable {
    /// Build a callable plus the slot its handle is recorded in.
    pub fn new(
        action: Action,
        keybinds: Weak<Keybinds<SimRuntime>>,
    ) -> (Self, Arc<OnceLock<Handle>>) {
        let handle = Arc::new(OnceLock::new());
        let callable = Self {
            action,
            keybinds,
            handle: handle.clone(),
        };
        (callable, handle)
    }
}

/// Toy scripting runtime with a reentrant global lock.
#[derive(Default)]
pub struct SimRuntime {
    /// Global runtime lock.
    lock: ReentrantMutex<()>,
    /// Callables invoked so far.
    calls: AtomicUsize,
}

impl SimRuntime {
    /// Number of callbacks invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ScriptRuntime for SimRuntime {
    type Value = SimValue;
    type Callable = SimCallable;
    type Guard<'a> = ReentrantMutexGuard<'a, ()>;

    fn lock(&self) -> Self::Guard<'_> {
        self.lock.lock()
    }

    fn event_value(&self, kind: EventKind) -> StdResult<SimValue, Fault> {
        Ok(SimValue::Event(kind))
    }

    fn call(&self, callable: &SimCallable, arg: Option<&SimValue>) -> StdResult<SimValue, Fault> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match arg {
            Some(v) => trace!(action = ?callable.action, arg = %v, "sim_call"),
            None => trace!(action = ?callable.action, "sim_call"),
        }
        match &callable.action {
            Action::Block => Ok(SimValue::Block),
            Action::Pass => Ok(SimValue::None),
            Action::Value(v) => Ok(SimValue::Int(*v)),
            Action::Once => {
                if let (Some(kb), Some(h)) = (callable.keybinds.upgrade(), callable.handle.get()) {
                    kb.deregister(*h);
                }
                Ok(SimValue::Block)
            }
            Action::ScriptError(msg) => Err(Fault::script(msg.clone())),
            Action::HostError(msg) => Err(Fault::host(msg.clone())),
            Action::Panic(msg) => panic::panic_any(msg.clone()),
        }
    }

    fn is_block_sentinel(&self, value: &SimValue) -> bool {
        matches!(value, SimValue::Block)
    }
}

/// The host's own, unpatched input handler.
struct HostHandler {
    /// Value it returns.
    ret: usize,
    /// Calls received.
    calls: AtomicUsize,
}

impl InputKeyFn for HostHandler {
    fn call(&self, _receiver: ObjectPtr, _params: &InputKeyParams) -> usize {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.ret
    }
}

/// Host process state visible to the hook.
pub struct SimHost {
    /// Executable image loaded at [`IMAGE_BASE`].
    image: Vec<u8>,
    /// The real input handler.
    handler: Arc<HostHandler>,
    /// Detour patched over the handler, if any.
    detour: Mutex<Option<Arc<dyn InputKeyFn>>>,
    /// Whether the player's controller is showing a menu.
    in_menu: Arc<AtomicBool>,
}

impl SimHost {
    /// A host whose image contains the function `signature` describes, or
    /// no such function when `present` is false.
    pub fn new(signature: &Pattern, present: bool, original_return: usize) -> Self {
        let mut image = vec![FILLER; FUNCTION_OFFSET];
        if present {
            image.extend(signature.bytes().iter().map(|b| b.unwrap_or(FILLER)));
        }
        image.extend([FILLER; 64]);
        Self {
            image,
            handler: Arc::new(HostHandler {
                ret: original_return,
                calls: AtomicUsize::new(0),
            }),
            detour: Mutex::new(None),
            in_menu: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enter or leave a menu.
    pub fn set_in_menu(&self, in_menu: bool) {
        self.in_menu.store(in_menu, Ordering::Relaxed);
    }

    /// Guard reading this host's menu state for [`PLAYER`].
    ///
    /// Other receivers have no known owner.
    pub fn menu_guard(
        &self,
    ) -> MenuGuard<impl Fn(ObjectPtr) -> Option<bool> + Send + Sync + 'static> {
        let in_menu = self.in_menu.clone();
        MenuGuard::new(move |receiver| {
            (receiver == PLAYER).then(|| in_menu.load(Ordering::Relaxed))
        })
    }

    /// Times the unpatched handler has run.
    pub fn handler_calls(&self) -> usize {
        self.handler.calls.load(Ordering::Relaxed)
    }

    /// Whether a detour is in place.
    pub fn is_patched(&self) -> bool {
        self.detour.lock().is_some()
    }

    /// Deliver a key event the way the host does: through whatever is
    /// currently at the handler's address.
    pub fn input_key(&self, params: &InputKeyParams) -> usize {
        let detour = self.detour.lock().clone();
        match detour {
            Some(d) => d.call(PLAYER, params),
            None => self.handler.call(PLAYER, params),
        }
    }
}

impl PatternScanner for SimHost {
    fn find(&self, pattern: &Pattern) -> Option<NativeAddr> {
        if pattern.is_empty() {
            return None;
        }
        let offset = self.image.windows(pattern.len()).position(|w| pattern.matches(w))?;
        let addr = NativeAddr::new(IMAGE_BASE + offset);
        debug!(offset, "sim_pattern_scan_hit");
        addr
    }
}

impl DetourInstaller for SimHost {
    fn install(
        &self,
        target: NativeAddr,
        detour: Arc<dyn InputKeyFn>,
        name: &str,
    ) -> Result<Arc<dyn InputKeyFn>> {
        if target.addr() != IMAGE_BASE + FUNCTION_OFFSET {
            return Err(Error::Detour {
                name: name.to_string(),
                reason: format!("{target} is not a function entry"),
            });
        }
        let mut slot = self.detour.lock();
        if slot.is_some() {
            return Err(Error::Detour {
                name: name.to_string(),
                reason: "target already patched".into(),
            });
        }
        *slot = Some(detour);
        let original: Arc<dyn InputKeyFn> = self.handler.clone();
        Ok(original)
    }
}

#[cfg(test)]
mod tests {
    use keybinds::{DEFAULT_SIGNATURE, HANDLED, HookConfig, HookState, KeyHook};
    use keyname::KeyName;

    use super::*;

    fn signature() -> Pattern {
        Pattern::parse(DEFAULT_SIGNATURE).unwrap()
    }

    #[test]
    fn scanner_finds_function_entry() {
        let host = SimHost::new(&signature(), true, 0);
        let addr = host.find(&signature()).unwrap();
        assert_eq!(addr.addr(), IMAGE_BASE + FUNCTION_OFFSET);
        let absent = SimHost::new(&signature(), false, 0);
        assert_eq!(absent.find(&signature()), None);
    }

    #[test]
    fn installer_rejects_wrong_target_and_double_patch() {
        let host = SimHost::new(&signature(), true, 0);
        let handler: Arc<dyn InputKeyFn> = host.handler.clone();
        let wrong = NativeAddr::new(IMAGE_BASE).unwrap();
        assert!(host.install(wrong, handler.clone(), "t").is_err());
        let right = NativeAddr::new(IMAGE_BASE + FUNCTION_OFFSET).unwrap();
        host.install(right, handler.clone(), "t").unwrap();
        assert!(host.is_patched());
        assert!(host.install(right, handler, "t").is_err());
    }

    #[test]
    fn hooked_host_end_to_end() {
        let host = SimHost::new(&signature(), true, 5);
        let kb = Arc::new(Keybinds::new(SimRuntime::default(), host.menu_guard()));
        let hook = KeyHook::new(kb.clone(), HookConfig::default());
        hook.install(&host, &host).unwrap();
        assert!(matches!(hook.state(), HookState::Installed(_)));

        let key = KeyName::new("SimTest_Once");
        let (callable, slot) = SimCallable::new(Action::Once, Arc::downgrade(&kb));
        slot.set(kb.register(key, None, callable)).unwrap();

        let press = InputKeyParams::new(key, EventKind::PRESSED);
        host.set_in_menu(true);
        assert_eq!(host.input_key(&press), 5);
        host.set_in_menu(false);
        assert_eq!(host.input_key(&press), HANDLED);
        assert_eq!(host.input_key(&press), 5);
        assert_eq!(host.handler_calls(), 2);
        assert_eq!(kb.runtime().calls(), 1);
        assert!(kb.is_empty());
    }

    #[test]
    fn panicking_callback_is_contained() {
        let host = SimHost::new(&signature(), true, 9);
        let kb = Arc::new(Keybinds::new(SimRuntime::default(), host.menu_guard()));
        let hook = KeyHook::new(kb.clone(), HookConfig::default());
        hook.install(&host, &host).unwrap();
        let key = KeyName::new("SimTest_Panic");
        let (callable, _) = SimCallable::new(Action::Panic("boom".into()), Arc::downgrade(&kb));
        kb.register(key, None, callable);
        assert_eq!(host.input_key(&InputKeyParams::new(key, EventKind::PRESSED)), 9);
    }
}
