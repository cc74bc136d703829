//! Scenario files: a hook configuration, a simulated host, and a script of
//! binding changes and key events to replay.
//!
//! ```ron
//! (
//!     host: (original_return: 0),
//!     bindings: [
//!         (key: "F1", on: Some("pressed"), action: Block),
//!         (key: "F2", action: Once),
//!     ],
//!     steps: [
//!         Key(key: "F1", kind: "pressed"),
//!         Menu(true),
//!         Key(key: "F1"),
//!     ],
//! )
//! ```

use std::{fs, path::Path};

use keybinds::HookConfig;
use keyname::{EventKind, KeyName};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What a simulated callback does when it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Return the block sentinel.
    Block,
    /// Return nothing.
    Pass,
    /// Return an ordinary value.
    Value(i64),
    /// Return the block sentinel, then deregister itself.
    Once,
    /// Raise a scripted error.
    ScriptError(String),
    /// Fail on the host side.
    HostError(String),
    /// Panic while being invoked.
    Panic(String),
}

/// One binding to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    /// Key to bind.
    pub key: KeyName,
    /// Only fire for this event kind.
    #[serde(default)]
    pub on: Option<EventKind>,
    /// Callback behaviour.
    pub action: Action,
}

/// A step of the replay script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Deliver a key event to the host's input handler.
    Key {
        /// Key name.
        key: KeyName,
        /// Event kind; defaults to pressed.
        #[serde(default = "pressed")]
        kind: EventKind,
    },
    /// Enter or leave a menu.
    Menu(bool),
    /// Register another binding.
    Bind(BindingSpec),
    /// Deregister by raw handle.
    Unbind(u64),
    /// Deregister every binding for a key.
    UnbindKey(KeyName),
    /// Deregister everything.
    UnbindAll,
}

/// Serde default for [`Step::Key`].
fn pressed() -> EventKind {
    EventKind::PRESSED
}

/// Serde default for [`HostSpec::signature_present`].
fn yes() -> bool {
    true
}

/// The simulated host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSpec {
    /// Whether the host image contains the hooked function's signature.
    #[serde(default = "yes")]
    pub signature_present: bool,
    /// Value the unpatched handler returns.
    #[serde(default)]
    pub original_return: usize,
    /// Start inside a menu.
    #[serde(default)]
    pub in_menu: bool,
}

impl Default for HostSpec {
    fn default() -> Self {
        Self {
            signature_present: true,
            original_return: 0,
            in_menu: false,
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Hook configuration.
    #[serde(default)]
    pub hook: HookConfig,
    /// Simulated host.
    #[serde(default)]
    pub host: HostSpec,
    /// Bindings registered before the first step.
    #[serde(default)]
    pub bindings: Vec<BindingSpec>,
    /// Replay script.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse and validate a scenario from RON text.
    pub fn from_ron(s: &str) -> Result<Self> {
        let scenario: Self = ron::from_str(s).map_err(|e| Error::Parse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.hook.pattern()?;
        let specs = self.bindings.iter().chain(self.steps.iter().filter_map(|s| match s {
            Step::Bind(b) => Some(b),
            _ => None,
        }));
        for spec in specs {
            if spec.key.as_str().trim().is_empty() {
                return Err(Error::invalid("binding with an empty key name"));
            }
        }
        if self.steps.iter().any(|s| matches!(s, Step::Unbind(0))) {
            return Err(Error::invalid("handle 0 is never issued"));
        }
        Ok(())
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
