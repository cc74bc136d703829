//! Environmental guard: host conditions under which callbacks must not run.

use crate::{ObjectPtr, Result};

/// Decides, per input call, whether bindings may run at all.
///
/// A suppressed event is not blocked: it still reaches the host's original
/// handler untouched.
pub trait InputGuard: Send + Sync {
    /// True if callbacks must not run for input delivered to `receiver`.
    fn suppress(&self, receiver: ObjectPtr) -> Result<bool>;
}

/// Guard that never suppresses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGuard;

impl InputGuard for NoGuard {
    fn suppress(&self, _receiver: ObjectPtr) -> Result<bool> {
        Ok(false)
    }
}

/// Suppresses while the receiver's owning controller is in a menu.
///
/// `lookup` reads host state for a receiver and returns:
/// - `Some(true)` when a menu or other cursor-driven surface is showing,
/// - `Some(false)` during normal play,
/// - `None` when the receiver has no usable owner.
///
/// An owner that cannot be inspected counts as "in a menu".
pub struct MenuGuard<F> {
    /// Host-specific menu state lookup.
    lookup: F,
}

impl<F> MenuGuard<F>
where
    F: Fn(ObjectPtr) -> Option<bool> + Send + Sync,
{
    /// Wrap a host menu state lookup.
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

impl<F> InputGuard for MenuGuard<F>
where
    F: Fn(ObjectPtr) -> Option<bool> + Send + Sync,
{
    fn suppress(&self, receiver: ObjectPtr) -> Result<bool> {
        if receiver.is_null() {
            return Ok(true);
        }
        Ok((self.lookup)(receiver).unwrap_or(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_guard_tracks_host_state() {
        let g = MenuGuard::new(|p: ObjectPtr| match p.addr() {
            1 => Some(false),
            2 => Some(true),
            _ => None,
        });
        assert!(!g.suppress(ObjectPtr::new(1)).unwrap());
        assert!(g.suppress(ObjectPtr::new(2)).unwrap());
        assert!(g.suppress(ObjectPtr::new(3)).unwrap());
        assert!(g.suppress(ObjectPtr::NULL).unwrap());
    }

    #[test]
    fn no_guard_never_suppresses() {
        assert!(!NoGuard.suppress(ObjectPtr::NULL).unwrap());
    }
}
