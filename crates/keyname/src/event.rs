use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

// Central mapping between well-known kinds and their spec strings.
// The first entry for a kind is the canonical spelling; later entries are
// parse-only aliases.
const EVENT_SPECS: &[(EventKind, &str)] = &[
    (EventKind::PRESSED, "pressed"),
    (EventKind::RELEASED, "released"),
    (EventKind::REPEAT, "repeat"),
    (EventKind::DOUBLE_CLICK, "double_click"),
    (EventKind::AXIS, "axis"),
    (EventKind::PRESSED, "down"),
    (EventKind::RELEASED, "up"),
    (EventKind::REPEAT, "repeated"),
    (EventKind::DOUBLE_CLICK, "doubleclick"),
];

/// An input transition as reported by the host (pressed, released, ...).
///
/// This is the host's raw enum value. Unknown values are carried through
/// untouched so bindings can still filter on them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventKind(u32);

impl EventKind {
    /// Key went down.
    pub const PRESSED: Self = Self(0);
    /// Key came up.
    pub const RELEASED: Self = Self(1);
    /// Auto-repeat while held.
    pub const REPEAT: Self = Self(2);
    /// Second press within the double-click window.
    pub const DOUBLE_CLICK: Self = Self(3);
    /// Analog axis update.
    pub const AXIS: Self = Self(4);

    /// Wrap a raw host value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw host value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Canonical lowercase name for well-known kinds.
    pub fn name(self) -> Option<&'static str> {
        EVENT_SPECS
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, s)| *s)
    }

    /// Parse a kind from a name (case-insensitive, aliases accepted) or a
    /// decimal raw value.
    pub fn from_spec(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(raw) = s.parse::<u32>() {
            return Some(Self(raw));
        }
        EVENT_SPECS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(k, _)| *k)
    }

    /// Spec string: the canonical name, or the raw number for unknown kinds.
    pub fn to_spec(self) -> String {
        match self.name() {
            Some(n) => n.to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(n) => f.write_str(n),
            None => write!(f, "event({})", self.0),
        }
    }
}

impl From<u32> for EventKind {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<EventKind> for u32 {
    fn from(k: EventKind) -> Self {
        k.0
    }
}

/// Accept either the raw number or a spec string when deserializing.
impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// Either spelling of a kind.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            /// Raw host value.
            Raw(u32),
            /// Name or alias.
            Spec(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Raw(raw) => Ok(Self(raw)),
            Repr::Spec(s) => Self::from_spec(&s)
                .ok_or_else(|| D::Error::custom(format!("unknown event kind '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_aliases_parse() {
        assert_eq!(EventKind::from_spec("Pressed"), Some(EventKind::PRESSED));
        assert_eq!(EventKind::from_spec("UP"), Some(EventKind::RELEASED));
        assert_eq!(EventKind::from_spec("doubleclick"), Some(EventKind::DOUBLE_CLICK));
        assert_eq!(EventKind::from_spec(" 4 "), Some(EventKind::AXIS));
        assert_eq!(EventKind::from_spec("17"), Some(EventKind::from_raw(17)));
        assert_eq!(EventKind::from_spec("sideways"), None);
    }

    #[test]
    fn canonical_name_is_first_entry() {
        assert_eq!(EventKind::PRESSED.name(), Some("pressed"));
        assert_eq!(EventKind::REPEAT.to_spec(), "repeat");
        assert_eq!(EventKind::from_raw(9).name(), None);
        assert_eq!(EventKind::from_raw(9).to_spec(), "9");
        assert_eq!(EventKind::from_raw(9).to_string(), "event(9)");
    }

    #[test]
    fn deserializes_from_number_or_name() {
        let a: EventKind = ron::from_str("2").unwrap();
        let b: EventKind = ron::from_str("\"repeat\"").unwrap();
        assert_eq!(a, b);
        assert!(ron::from_str::<EventKind>("\"bogus\"").is_err());
        assert_eq!(ron::to_string(&EventKind::RELEASED).unwrap(), "1");
    }
}
