//! Hook shim installed in front of the host's native key handler.
//!
//! Locating the handler and patching it are external capabilities, reached
//! through [`PatternScanner`] and [`DetourInstaller`]. The shim itself only
//! decides, per call, whether to answer the host directly or forward to the
//! original function.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, OnceLock},
};

use tracing::{debug, error, warn};

use crate::{
    Error, HookConfig, InputKeyFn, InputKeyParams, Keybinds, NOT_HANDLED, NativeAddr, ObjectPtr,
    Pattern, Result, ScriptRuntime,
};

/// Finds native functions in the host image by byte signature.
pub trait PatternScanner {
    /// Address of the first match, or `None` if the signature is absent.
    fn find(&self, pattern: &Pattern) -> Option<NativeAddr>;
}

/// Redirects a native function to a replacement.
pub trait DetourInstaller {
    /// Patch `target` so calls reach `detour`, returning a callable that runs
    /// the unpatched original.
    ///
    /// The detour must not become reachable before this returns.
    fn install(
        &self,
        target: NativeAddr,
        detour: Arc<dyn InputKeyFn>,
        name: &str,
    ) -> Result<Arc<dyn InputKeyFn>>;
}

/// Lifecycle of a [`KeyHook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// Not patched; the host runs its handler directly.
    Uninstalled,
    /// Patched at the given address.
    Installed(NativeAddr),
}

/// Original function recorded at install time.
struct Installed {
    /// Address that was patched.
    target: NativeAddr,
    /// Pass-through to the unpatched function.
    original: Arc<dyn InputKeyFn>,
}

/// The shim. Once installed it stays installed for the life of the process.
pub struct KeyHook<R: ScriptRuntime> {
    /// Bindings consulted on every call.
    keybinds: Arc<Keybinds<R>>,
    /// Hook name, signature and handled sentinel.
    config: HookConfig,
    /// Set exactly once, by a successful install.
    installed: OnceLock<Installed>,
}

impl<R: ScriptRuntime> KeyHook<R> {
    /// Create an uninstalled hook.
    pub fn new(keybinds: Arc<Keybinds<R>>, config: HookConfig) -> Arc<Self> {
        Arc::new(Self {
            keybinds,
            config,
            installed: OnceLock::new(),
        })
    }

    /// The bindings this hook dispatches to.
    pub fn keybinds(&self) -> &Arc<Keybinds<R>> {
        &self.keybinds
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HookState {
        match self.installed.get() {
            Some(i) => HookState::Installed(i.target),
            None => HookState::Uninstalled,
        }
    }

    /// Locate the native handler and redirect it through this shim.
    ///
    /// On failure the error is logged, the hook stays uninstalled and the
    /// host keeps running its own handler.
    pub fn install(
        self: &Arc<Self>,
        scanner: &dyn PatternScanner,
        installer: &dyn DetourInstaller,
    ) -> Result<()> {
        let r = self.try_install(scanner, installer);
        if let Err(e) = &r {
            error!(name = %self.config.name, error = %e, "keybind_hook_install_failed");
        }
        r
    }

    /// Body of [`KeyHook::install`], without the logging.
    fn try_install(
        self: &Arc<Self>,
        scanner: &dyn PatternScanner,
        installer: &dyn DetourInstaller,
    ) -> Result<()> {
        let name = &self.config.name;
        if self.installed.get().is_some() {
            return Err(Error::AlreadyInstalled { name: name.clone() });
        }

        let pattern = self.config.pattern()?;
        let target = scanner
            .find(&pattern)
            .ok_or_else(|| Error::PatternNotFound { name: name.clone() })?;
        debug!(%name, %target, "keybind_hook_pattern_found");

        let detour: Arc<dyn InputKeyFn> = self.clone();
        let original = installer.install(target, detour, name)?;
        self.installed
            .set(Installed { target, original })
            .map_err(|_| Error::AlreadyInstalled { name: name.clone() })?;
        debug!(%name, %target, "keybind_hook_installed");
        Ok(())
    }

    /// Run dispatch behind a boundary that absorbs every failure.
    fn should_block(&self, receiver: ObjectPtr, params: &InputKeyParams) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| self.keybinds.dispatch(receiver, params))) {
            Ok(Ok(block)) => block,
            Ok(Err(e)) => {
                error!(key = %params.key, error = %e, "keybind_dispatch_failed");
                false
            }
            Err(_) => {
                error!(key = %params.key, "keybind_dispatch_panicked");
                false
            }
        }
    }
}

impl<R: ScriptRuntime> InputKeyFn for KeyHook<R> {
    fn call(&self, receiver: ObjectPtr, params: &InputKeyParams) -> usize {
        if self.should_block(receiver, params) {
            return self.config.handled_return;
        }
        match self.installed.get() {
            Some(i) => i.original.call(receiver, params),
            None => {
                warn!(name = %self.config.name, "keybind_hook_called_while_uninstalled");
                NOT_HANDLED
            }
        }
    }
}
