//! Type identification keys.
//!
//! [`TypeKey`] is the canonical identity of a type in the dependency graph.
//! Two keys are the same node iff their qualified names are equal.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use wiregen_support::rendering::shorten_type_name;

/// Canonical, globally unique identifier for a type.
///
/// The key wraps the type's fully qualified name. Cloning is cheap, so
/// keys are passed around by value the way the graph needs them.
///
/// # Examples
/// ```
/// use wiregen_core::key::TypeKey;
///
/// let key = TypeKey::new("app::greet::Greeter");
/// assert_eq!(key.name(), "app::greet::Greeter");
/// assert_eq!(key.short_name(), "Greeter");
/// assert_eq!(key, TypeKey::from("app::greet::Greeter"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
    /// Creates a key from a qualified type name.
    ///
    /// Surrounding whitespace is not part of a type's identity.
    #[inline]
    pub fn new(qualified_name: impl AsRef<str>) -> Self {
        Self(Arc::from(qualified_name.as_ref().trim()))
    }

    /// Returns the full qualified name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns the name with every path reduced to its last segment.
    pub fn short_name(&self) -> String {
        shorten_type_name(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for TypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.0)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_name() {
        assert_eq!(TypeKey::new("app::Message"), TypeKey::new("app::Message"));
        assert_ne!(TypeKey::new("app::Message"), TypeKey::new("other::Message"));
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(TypeKey::new("  app::Message "), TypeKey::new("app::Message"));
    }

    #[test]
    fn key_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(TypeKey::new("String"), "string");
        map.insert(TypeKey::new("i32"), "i32");
        assert_eq!(map.get(&TypeKey::new("String")), Some(&"string"));
        assert_eq!(map.get(&TypeKey::new("bool")), None);
    }

    #[test]
    fn display_and_debug() {
        let key = TypeKey::new("app::Event");
        assert_eq!(format!("{key}"), "app::Event");
        assert_eq!(format!("{key:?}"), "TypeKey(app::Event)");
    }

    #[test]
    fn serializes_as_plain_string() {
        let key = TypeKey::new("app::Event");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"app::Event\"");
    }
}
