//! Keybinds
//!
//! Intercepts a host application's native key-input handler and runs
//! script-registered callbacks for matching keys:
//! - [`Keybinds`]: the binding API (`register`, `deregister`, ...) and the
//!   dispatch algorithm that decides whether an event is blocked
//! - [`KeyHook`]: the shim installed in front of the native handler; it
//!   answers the host directly for blocked events and forwards everything else
//! - [`ScriptRuntime`], [`InputGuard`], [`PatternScanner`], [`DetourInstaller`]:
//!   the seams to the host and its embedded scripting runtime
//!
//! Nothing in this crate ever fails the host: faults are logged and the
//! event falls through to the original handler.

mod config;
mod dispatch;
mod error;
mod guard;
mod hook;
mod native;
mod pattern;
mod registry;
mod runtime;

pub mod test_support;

pub use config::{DEFAULT_HOOK_NAME, DEFAULT_SIGNATURE, HookConfig};
pub use dispatch::{BindingInfo, Keybinds};
pub use error::{Error, PatternError, Result};
pub use guard::{InputGuard, MenuGuard, NoGuard};
pub use hook::{DetourInstaller, HookState, KeyHook, PatternScanner};
pub use keyname::{EventKind, KeyName};
pub use native::{
    HANDLED, InputDeviceId, InputKeyFn, InputKeyParams, NOT_HANDLED, NativeAddr, ObjectPtr,
};
pub use pattern::Pattern;
pub use registry::{Binding, Handle, Registry};
pub use runtime::{Fault, FaultKind, ScriptRuntime, log_fault};
