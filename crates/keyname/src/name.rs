use std::{
    collections::HashMap, convert::Infallible, fmt, num::NonZeroUsize, str::FromStr, sync::OnceLock,
};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Process-wide name pool. Entries are never freed.
struct Pool {
    /// Case-folded spelling → interned id.
    index: HashMap<String, NonZeroUsize>,
    /// First-seen spelling for each id; id `n` lives at `names[n - 1]`.
    names: Vec<&'static str>,
}

/// Shared pool backing every [`KeyName`].
static POOL: OnceLock<RwLock<Pool>> = OnceLock::new();

/// Access the global pool.
fn pool() -> &'static RwLock<Pool> {
    POOL.get_or_init(|| {
        RwLock::new(Pool {
            index: HashMap::new(),
            names: Vec::new(),
        })
    })
}

/// Case-fold a spelling into its pool key.
fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// An interned, case-insensitive key name (e.g. `"LeftMouseButton"`, `"F1"`).
///
/// Two names compare equal iff their spellings are equal ignoring case, and
/// comparison is a single integer compare. The spelling seen first for a name
/// is kept for display.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct KeyName(NonZeroUsize);

impl KeyName {
    /// Intern `name`, returning the existing identity if any spelling of it is
    /// already known.
    pub fn new(name: &str) -> Self {
        let folded = fold(name);
        if let Some(id) = pool().read().index.get(&folded) {
            return Self(*id);
        }

        let mut guard = pool().write();
        // Another thread may have interned it between the two locks.
        if let Some(id) = guard.index.get(&folded) {
            return Self(*id);
        }
        let id = NonZeroUsize::MIN.saturating_add(guard.names.len());
        guard.names.push(Box::leak(name.to_owned().into_boxed_str()));
        guard.index.insert(folded, id);
        Self(id)
    }

    /// Look up `name` without interning it.
    pub fn find(name: &str) -> Option<Self> {
        pool().read().index.get(&fold(name)).copied().map(Self)
    }

    /// The display spelling of this name.
    pub fn as_str(self) -> &'static str {
        pool()
            .read()
            .names
            .get(self.0.get() - 1)
            .copied()
            .unwrap_or_default()
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyName").field(&self.as_str()).finish()
    }
}

impl From<&str> for KeyName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl FromStr for KeyName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Serialize for KeyName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for KeyName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, thread};

    use super::*;

    #[test]
    fn equality_ignores_case() {
        let a = KeyName::new("LeftMouseButton");
        let b = KeyName::new("leftmousebutton");
        let c = KeyName::new("LEFTMOUSEBUTTON");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_ne!(a, KeyName::new("RightMouseButton"));
    }

    #[test]
    fn first_spelling_is_kept_for_display() {
        let first = KeyName::new("NameTest_GamepadFaceButtonBottom");
        let again = KeyName::new("nametest_gamepadfacebuttonbottom");
        assert_eq!(again.as_str(), "NameTest_GamepadFaceButtonBottom");
        assert_eq!(first.to_string(), "NameTest_GamepadFaceButtonBottom");
        assert_eq!(format!("{first:?}"), "KeyName(\"NameTest_GamepadFaceButtonBottom\")");
    }

    #[test]
    fn find_does_not_intern() {
        assert_eq!(KeyName::find("NameTest_NeverInterned"), None);
        let k = KeyName::new("NameTest_Interned");
        assert_eq!(KeyName::find("nametest_INTERNED"), Some(k));
    }

    #[test]
    fn concurrent_interning_agrees() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                thread::spawn(move || {
                    let spelling = if i % 2 == 0 { "NameTest_Race" } else { "nametest_race" };
                    KeyName::new(spelling)
                })
            })
            .collect();
        let ids: HashSet<KeyName> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn serde_round_trips_through_spelling() {
        let k = KeyName::new("NameTest_F13");
        let s = ron::to_string(&k).unwrap();
        assert_eq!(s, "\"NameTest_F13\"");
        let back: KeyName = ron::from_str("\"nametest_f13\"").unwrap();
        assert_eq!(back, k);
    }
}
