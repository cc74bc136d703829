//! End-to-end behaviour through the installed hook: the host calls the patched
//! function, bindings run, and the host sees either the handled value or the
//! original handler's result.

use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use keybinds::{
    EventKind, Fault, HANDLED, Handle, HookConfig, HookState, InputKeyParams, KeyHook, KeyName,
    Keybinds, MenuGuard, NativeAddr, ObjectPtr, ScriptRuntime,
    test_support::{MockCallable, MockGuard, MockInstaller, MockRuntime, MockScanner, MockValue},
};
use logging::Capture;
use parking_lot::Mutex;
use proptest::prelude::*;
use tracing::subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry};

const ORIGINAL_RET: usize = 42;
const PLAYER: ObjectPtr = ObjectPtr::new(0x7000);

struct Harness {
    hook: Arc<KeyHook<MockRuntime>>,
    installer: MockInstaller,
    guard: MockGuard,
}

impl Harness {
    fn new() -> Self {
        let guard = MockGuard::new();
        let kb = Arc::new(Keybinds::new(MockRuntime::new(), guard.handle()));
        let hook = KeyHook::new(kb, HookConfig::default());
        let installer = MockInstaller::new(ORIGINAL_RET);
        let addr = NativeAddr::new(0x1_4000_1000).unwrap();
        hook.install(&MockScanner::at(addr), &installer).unwrap();
        assert_eq!(hook.state(), HookState::Installed(addr));
        Self {
            hook,
            installer,
            guard,
        }
    }

    fn kb(&self) -> &Arc<Keybinds<MockRuntime>> {
        self.hook.keybinds()
    }

    fn fire(&self, key: KeyName, kind: EventKind) -> usize {
        self.installer
            .fire(PLAYER, &InputKeyParams::new(key, kind))
            .unwrap()
    }
}

fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str, ret: MockValue) -> MockCallable {
    let log = log.clone();
    let tag = tag.to_string();
    MockCallable::new(move |_| {
        log.lock().push(tag.clone());
        Ok(ret.clone())
    })
}

#[test]
fn press_blocks_and_release_forwards() {
    let h = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let f1 = KeyName::new("F1");
    h.kb()
        .register(f1, Some(EventKind::PRESSED), recorder(&log, "press", MockValue::Block));

    assert_eq!(h.fire(KeyName::new("f1"), EventKind::PRESSED), HANDLED);
    assert_eq!(h.fire(f1, EventKind::RELEASED), ORIGINAL_RET);
    assert_eq!(h.fire(KeyName::new("F2"), EventKind::PRESSED), ORIGINAL_RET);

    assert_eq!(*log.lock(), vec!["press"]);
    let forwarded: Vec<EventKind> = h
        .installer
        .original()
        .calls()
        .iter()
        .map(|(_, p)| p.event)
        .collect();
    assert_eq!(forwarded, vec![EventKind::RELEASED, EventKind::PRESSED]);
}

#[test]
fn registration_order_across_mixed_filters() {
    let h = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let key = KeyName::new("Integration_Order");
    h.kb().register(key, None, recorder(&log, "a", MockValue::None));
    h.kb()
        .register(key, Some(EventKind::PRESSED), recorder(&log, "b", MockValue::None));
    h.kb()
        .register(key, Some(EventKind::RELEASED), recorder(&log, "c", MockValue::None));
    h.kb().register(key, None, recorder(&log, "d", MockValue::None));

    assert_eq!(h.fire(key, EventKind::PRESSED), ORIGINAL_RET);
    assert_eq!(*log.lock(), vec!["a", "b", "d"]);
}

#[test]
fn one_shot_binding_removes_itself() {
    let h = Harness::new();
    let key = KeyName::new("Integration_OneShot");
    let weak = Arc::downgrade(h.kb());
    let own: Arc<OnceLock<Handle>> = Arc::new(OnceLock::new());
    let own_cb = own.clone();
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_cb = runs.clone();
    let handle = h.kb().register(
        key,
        Some(EventKind::PRESSED),
        MockCallable::new(move |_| {
            runs_cb.fetch_add(1, Ordering::SeqCst);
            if let (Some(kb), Some(h)) = (weak.upgrade(), own_cb.get()) {
                kb.deregister(*h);
            }
            Ok(MockValue::Block)
        }),
    );
    own.set(handle).unwrap();

    assert_eq!(h.fire(key, EventKind::PRESSED), HANDLED);
    assert_eq!(h.fire(key, EventKind::PRESSED), ORIGINAL_RET);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(h.kb().is_empty());
}

#[test]
fn menu_suppresses_everything() {
    let h = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let key = KeyName::new("Integration_Menu");
    h.kb().register(key, None, recorder(&log, "x", MockValue::Block));

    h.guard.set_suppress(true);
    assert_eq!(h.fire(key, EventKind::PRESSED), ORIGINAL_RET);
    h.guard.set_suppress(false);
    assert_eq!(h.fire(key, EventKind::PRESSED), HANDLED);
    assert_eq!(*log.lock(), vec!["x"]);
}

#[test]
fn menu_guard_checks_receiver() {
    let in_menu = Arc::new(AtomicUsize::new(0));
    let menu_state = in_menu.clone();
    let guard = MenuGuard::new(move |receiver: ObjectPtr| {
        (receiver == PLAYER).then(|| menu_state.load(Ordering::SeqCst) != 0)
    });
    let kb = Keybinds::new(MockRuntime::new(), guard);
    let key = KeyName::new("Integration_MenuGuard");
    kb.register(key, None, MockCallable::returning(MockValue::Block));
    let params = InputKeyParams::new(key, EventKind::PRESSED);

    assert!(kb.dispatch(PLAYER, &params).unwrap());
    in_menu.store(1, Ordering::SeqCst);
    assert!(!kb.dispatch(PLAYER, &params).unwrap());
    in_menu.store(0, Ordering::SeqCst);
    // Unknown owner: callbacks do not run.
    assert!(!kb.dispatch(ObjectPtr::new(0x1234), &params).unwrap());
    assert!(!kb.dispatch(ObjectPtr::NULL, &params).unwrap());
}

#[test]
fn faults_are_logged_and_isolated() {
    let h = Harness::new();
    let capture = Capture::new(64);
    let key = KeyName::new("Integration_Faults");
    h.kb()
        .register(key, None, MockCallable::new(|_| Err(Fault::script("NameError: x"))));
    let panicking = h.kb().register(key, None, MockCallable::new(|_| panic!("bad cast")));
    h.kb()
        .register(key, None, MockCallable::returning(MockValue::Block));

    let ret = subscriber::with_default(registry().with(capture.layer()), || {
        h.fire(key, EventKind::PRESSED)
    });
    assert_eq!(ret, HANDLED);

    let script = capture.find("keybind_callback_script_error");
    assert_eq!(script.len(), 1);
    assert_eq!(script[0].level, "WARN");
    assert_eq!(script[0].field("key"), Some("Integration_Faults"));

    let host = capture.find("keybind_callback_host_error");
    assert_eq!(host.len(), 1);
    assert_eq!(host[0].level, "ERROR");
    assert_eq!(host[0].field("handle"), Some(panicking.to_string().as_str()));
}

#[test]
fn guard_failure_forwards_and_logs() {
    let h = Harness::new();
    let capture = Capture::new(16);
    let key = KeyName::new("Integration_GuardFail");
    h.kb()
        .register(key, None, MockCallable::returning(MockValue::Block));
    h.guard.set_fail(true);

    let ret = subscriber::with_default(registry().with(capture.layer()), || {
        h.fire(key, EventKind::PRESSED)
    });
    assert_eq!(ret, ORIGINAL_RET);
    assert_eq!(capture.find("keybind_dispatch_failed").len(), 1);
}

#[test]
fn reentrant_registration_from_callback() {
    let h = Harness::new();
    let key = KeyName::new("Integration_Reentrant");
    let other = KeyName::new("Integration_Reentrant_Other");
    let weak = Arc::downgrade(h.kb());
    h.kb().register(
        key,
        Some(EventKind::PRESSED),
        MockCallable::new(move |_| {
            if let Some(kb) = weak.upgrade() {
                let _rt = kb.runtime().lock();
                kb.register(other, None, MockCallable::returning(MockValue::Block));
            }
            Ok(MockValue::None)
        }),
    );

    assert_eq!(h.fire(key, EventKind::PRESSED), ORIGINAL_RET);
    assert_eq!(h.fire(other, EventKind::REPEAT), HANDLED);
    assert_eq!(h.kb().runtime().unlocked_calls(), 0);
}

#[test]
fn threads_share_one_binding_set() {
    let h = Arc::new(Harness::new());
    let key = KeyName::new("Integration_Threads");
    let count = Arc::new(AtomicUsize::new(0));
    let count_cb = count.clone();
    h.kb().register(
        key,
        None,
        MockCallable::new(move |_| {
            count_cb.fetch_add(1, Ordering::SeqCst);
            Ok(MockValue::None)
        }),
    );

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let h = h.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    h.fire(key, EventKind::REPEAT);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(count.load(Ordering::SeqCst), 200);
    assert_eq!(h.kb().runtime().unlocked_calls(), 0);
}

proptest! {
    #[test]
    fn blocks_iff_a_matching_callback_returns_sentinel(
        bindings in prop::collection::vec((prop::option::of(0u32..4), any::<bool>()), 0..8),
        kind in 0u32..4,
    ) {
        let kb = Keybinds::new(MockRuntime::new(), MockGuard::new());
        let key = KeyName::new("Integration_Prop");
        for (filter, block) in &bindings {
            let ret = if *block { MockValue::Block } else { MockValue::Int(0) };
            kb.register(key, filter.map(EventKind::from_raw), MockCallable::returning(ret));
        }
        let kind = EventKind::from_raw(kind);
        let expected = bindings
            .iter()
            .any(|(f, block)| *block && f.is_none_or(|f| f == kind.raw()));
        let got = kb.dispatch(PLAYER, &InputKeyParams::new(key, kind)).unwrap();
        prop_assert_eq!(got, expected);
    }
}
