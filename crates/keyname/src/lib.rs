//! keyname: identities for observed key input.
//!
//! - `KeyName`: an interned, case-insensitive key name. Cheap to copy and
//!   compare; used as the lookup key for bindings and as the key carried by
//!   native input events.
//! - `EventKind`: the host's input transition value (pressed, released,
//!   repeat, ...), with spec helpers `EventKind::from_spec` and
//!   `EventKind::to_spec`.

mod name;
pub use name::KeyName;

mod event;
pub use event::EventKind;
