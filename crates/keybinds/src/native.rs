//! Shapes of the hooked native call.

use std::{fmt, num::NonZeroUsize};

use keyname::{EventKind, KeyName};

/// Returned by the shim when a binding consumed the event.
pub const HANDLED: usize = 1;

/// Returned by the shim when it has no original function to forward to.
pub const NOT_HANDLED: usize = 0;

/// Opaque address of the host object receiving an input call.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ObjectPtr(usize);

impl ObjectPtr {
    /// The null object.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address.
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// The raw address.
    pub const fn addr(self) -> usize {
        self.0
    }

    /// True for the null object.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ObjectPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPtr({:#x})", self.0)
    }
}

/// Address of a native function inside the host image. Never null.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NativeAddr(NonZeroUsize);

impl NativeAddr {
    /// Wrap a raw address; `None` for null.
    pub const fn new(addr: usize) -> Option<Self> {
        match NonZeroUsize::new(addr) {
            Some(a) => Some(Self(a)),
            None => None,
        }
    }

    /// The raw address.
    pub const fn addr(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for NativeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeAddr({:#x})", self.0)
    }
}

impl fmt::Display for NativeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Host input device identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct InputDeviceId(pub i32);

/// Parameters of one native key-input call.
///
/// Only `key` and `event` matter for dispatch; the rest is carried so the
/// original function can be called with exactly what it was given.
#[derive(Clone, Debug, PartialEq)]
pub struct InputKeyParams {
    /// Key the event is for.
    pub key: KeyName,
    /// Device that produced it.
    pub device: InputDeviceId,
    /// Transition kind.
    pub event: EventKind,
    /// Number of samples folded into this event.
    pub num_samples: i32,
    /// Frame delta in seconds.
    pub delta_time: f32,
    /// Analog delta.
    pub delta: [f64; 3],
    /// Set when a gamepad overrides keyboard input.
    pub gamepad_override: bool,
}

impl InputKeyParams {
    /// Params for a single digital sample of `event` on `key`.
    pub fn new(key: KeyName, event: EventKind) -> Self {
        Self {
            key,
            device: InputDeviceId::default(),
            event,
            num_samples: 1,
            delta_time: 0.0,
            delta: [0.0; 3],
            gamepad_override: false,
        }
    }
}

/// A callable with the hooked function's signature: either the shim itself
/// or the original function it forwards to.
pub trait InputKeyFn: Send + Sync {
    /// Handle one input call; the return value goes straight back to the host.
    fn call(&self, receiver: ObjectPtr, params: &InputKeyParams) -> usize;
}

impl<F> InputKeyFn for F
where
    F: Fn(ObjectPtr, &InputKeyParams) -> usize + Send + Sync,
{
    fn call(&self, receiver: ObjectPtr, params: &InputKeyParams) -> usize {
        self(receiver, params)
    }
}
