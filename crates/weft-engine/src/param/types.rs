//! Parameter type kinds and the alias-normalizing type registry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of value a parameter declares, accepts, or emits.
///
/// Builtin kinds form a closed set; user-defined types are carried as
/// [`ValueType::Custom`] with a lowercase-normalized name, so compatibility
/// checks reduce to plain equality after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Matches any data type on the accepting side.
    Any,
    /// Matches nothing, on either side.
    None,
    /// Control-flow signal. Reserved: never compared against data types.
    Control,
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// UTF-8 text.
    Text,
    /// Raw binary data.
    Bytes,
    /// Ordered list.
    List,
    /// String-keyed map.
    Map,
    /// User-defined type, name normalized to lowercase.
    Custom(String),
}

impl ValueType {
    /// Returns the canonical lowercase name of this type.
    pub fn name(&self) -> &str {
        match self {
            ValueType::Any => "any",
            ValueType::None => "none",
            ValueType::Control => "control",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Text => "text",
            ValueType::Bytes => "bytes",
            ValueType::List => "list",
            ValueType::Map => "map",
            ValueType::Custom(name) => name,
        }
    }

    /// Returns whether this is the control-flow type.
    pub const fn is_control(&self) -> bool {
        matches!(self, ValueType::Control)
    }

    /// Returns whether this is the wildcard type.
    pub const fn is_any(&self) -> bool {
        matches!(self, ValueType::Any)
    }

    /// Returns whether this is the never-matching type.
    pub const fn is_none(&self) -> bool {
        matches!(self, ValueType::None)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = std::convert::Infallible;

    /// Parses a type name case-insensitively with builtin aliases.
    /// Unknown names become [`ValueType::Custom`], lowercased.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let value_type = match normalized.as_str() {
            "any" | "*" => ValueType::Any,
            "none" | "never" => ValueType::None,
            "control" | "exec" => ValueType::Control,
            "bool" | "boolean" => ValueType::Bool,
            "int" | "integer" => ValueType::Int,
            "float" | "number" | "double" => ValueType::Float,
            "text" | "str" | "string" => ValueType::Text,
            "bytes" | "blob" | "binary" => ValueType::Bytes,
            "list" | "array" => ValueType::List,
            "map" | "dict" | "object" => ValueType::Map,
            _ => ValueType::Custom(normalized),
        };
        Ok(value_type)
    }
}

impl From<&str> for ValueType {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or(ValueType::Any)
    }
}

impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}

/// Checks whether a value of `source` type may flow into a port declaring
/// `target` type.
///
/// Rules, in order:
/// - `none` on either side never matches.
/// - `control` matches only `control`; it is never compared against data
///   types in either direction.
/// - A target of `any` accepts every data type.
/// - Otherwise the normalized types must be equal.
pub fn type_allows(source: &ValueType, target: &ValueType) -> bool {
    if source.is_none() || target.is_none() {
        return false;
    }
    if source.is_control() || target.is_control() {
        return source.is_control() && target.is_control();
    }
    if target.is_any() {
        return true;
    }
    source == target
}

/// Registry of user-defined type names and their aliases.
///
/// Registration normalizes names once so later compatibility checks are
/// plain equality on [`ValueType`] values. Builtin aliases are always
/// honored; registered aliases are consulted before falling back to
/// [`ValueType::from_str`].
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    aliases: HashMap<String, ValueType>,
}

impl TypeRegistry {
    /// Creates a registry with no custom entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom type, returning its canonical form.
    pub fn register(&mut self, name: &str) -> ValueType {
        let canonical = ValueType::Custom(name.trim().to_ascii_lowercase());
        self.aliases
            .insert(canonical.name().to_owned(), canonical.clone());
        canonical
    }

    /// Registers an alias for an existing type.
    pub fn register_alias(&mut self, alias: &str, target: ValueType) {
        self.aliases
            .insert(alias.trim().to_ascii_lowercase(), target);
    }

    /// Parses a type name, honoring registered aliases before builtins.
    pub fn parse(&self, name: &str) -> ValueType {
        let normalized = name.trim().to_ascii_lowercase();
        if let Some(value_type) = self.aliases.get(&normalized) {
            return value_type.clone();
        }
        ValueType::from(name)
    }

    /// Returns the number of registered entries.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns true if no custom entries are registered.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builtin_aliases() {
        assert_eq!(ValueType::from("STR"), ValueType::Text);
        assert_eq!(ValueType::from("String"), ValueType::Text);
        assert_eq!(ValueType::from("integer"), ValueType::Int);
        assert_eq!(ValueType::from("Number"), ValueType::Float);
        assert_eq!(ValueType::from("dict"), ValueType::Map);
        assert_eq!(ValueType::from("exec"), ValueType::Control);
    }

    #[test]
    fn test_parse_custom_normalizes_case() {
        assert_eq!(
            ValueType::from("ImageFrame"),
            ValueType::Custom("imageframe".into())
        );
        assert_eq!(ValueType::from("  imageFRAME "), ValueType::from("imageframe"));
    }

    #[test]
    fn test_type_allows_reflexive() {
        for name in ["bool", "int", "float", "text", "bytes", "list", "map", "imageframe"] {
            let value_type = ValueType::from(name);
            assert!(type_allows(&value_type, &value_type), "{name} should match itself");
        }
    }

    #[test]
    fn test_any_accepts_all_data_types() {
        assert!(type_allows(&ValueType::Int, &ValueType::Any));
        assert!(type_allows(&ValueType::Custom("mesh".into()), &ValueType::Any));
        // Control is reserved, even against any.
        assert!(!type_allows(&ValueType::Control, &ValueType::Any));
    }

    #[test]
    fn test_none_never_matches() {
        assert!(!type_allows(&ValueType::None, &ValueType::None));
        assert!(!type_allows(&ValueType::None, &ValueType::Any));
        assert!(!type_allows(&ValueType::Int, &ValueType::None));
    }

    #[test]
    fn test_control_matches_only_control() {
        assert!(type_allows(&ValueType::Control, &ValueType::Control));
        assert!(!type_allows(&ValueType::Control, &ValueType::Int));
        assert!(!type_allows(&ValueType::Int, &ValueType::Control));
    }

    #[test]
    fn test_registry_custom_aliases() {
        let mut registry = TypeRegistry::new();
        let frame = registry.register("ImageFrame");
        registry.register_alias("frame", frame.clone());

        assert_eq!(registry.parse("FRAME"), frame);
        assert_eq!(registry.parse("imageframe"), frame);
        // Unregistered names still fall back to builtin parsing.
        assert_eq!(registry.parse("int"), ValueType::Int);
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&ValueType::Text).unwrap();
        assert_eq!(json, "\"text\"");
        let parsed: ValueType = serde_json::from_str("\"string\"").unwrap();
        assert_eq!(parsed, ValueType::Text);
    }
}
