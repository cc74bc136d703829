//! Hook configuration.

use serde::{Deserialize, Serialize};

use crate::{HANDLED, Pattern, Result};

/// Name of the hooked input handler, used in logs and errors.
pub const DEFAULT_HOOK_NAME: &str = "UGbxEnhancedPlayerInput::InputKey";

/// Prologue of the player-input key handler.
pub const DEFAULT_SIGNATURE: &str = concat!(
    "41 57",
    "41 56",
    "41 54",
    "56",
    "57",
    "55",
    "53",
    "48 81 EC ????????",
    "0F29 BC 24 ????????",
    "0F29 B4 24 ????????",
    "48 89 D7",
    "48 89 CE",
    "48 8B 05 ????????",
    "48 31 E0",
    "48 89 44 24 ??",
    "48 89 D1",
);

/// Where and how to hook the native input handler.
///
/// Every field has a default, so an empty RON document `()` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Human-readable name of the hooked function.
    pub name: String,
    /// Byte signature locating the function.
    pub signature: String,
    /// Value returned to the host when a binding blocks an event.
    pub handled_return: usize,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_HOOK_NAME.to_string(),
            signature: DEFAULT_SIGNATURE.to_string(),
            handled_return: HANDLED,
        }
    }
}

impl HookConfig {
    /// Parse the configured signature.
    pub fn pattern(&self) -> Result<Pattern> {
        Ok(Pattern::parse(&self.signature)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn default_signature_is_valid() {
        let cfg = HookConfig::default();
        let p = cfg.pattern().unwrap();
        assert_eq!(p.len(), 57);
        assert_eq!(p.bytes()[0], Some(0x41));
        assert_eq!(p.bytes()[56], Some(0xD1));
        assert_eq!(cfg.handled_return, 1);
    }

    #[test]
    fn ron_fields_default_individually() {
        let cfg: HookConfig = ron::from_str("(name: \"Test::Input\")").unwrap();
        assert_eq!(cfg.name, "Test::Input");
        assert_eq!(cfg.signature, DEFAULT_SIGNATURE);
        let empty: HookConfig = ron::from_str("()").unwrap();
        assert_eq!(empty, HookConfig::default());
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(ron::from_str::<HookConfig>("(handled_return: \"x\")").is_err());
        let cfg = HookConfig {
            signature: "ZZ".into(),
            ..HookConfig::default()
        };
        assert!(matches!(cfg.pattern(), Err(Error::Pattern(_))));
    }
}
