//! The in-memory registry of declared enum types.

use indexmap::IndexMap;

use crate::error::SchemaError;

/// An insertion-ordered `name → ordered value list` map, with the
/// following registration semantics:
///
/// - same name, same ordered values → no-op
/// - same name, different values → [`SchemaError::EnumRedefined`]
/// - different name, identical ordered values → [`SchemaError::EnumDuplicateValues`]
#[derive(Debug, Default, Clone)]
pub struct EnumRegistry {
    entries: IndexMap<String, Vec<String>>,
}

impl EnumRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enum. `name` and every value are case-folded upper
    /// before storage.
    pub fn register(&mut self, name: &str, values: &[String]) -> Result<(), SchemaError> {
        let name = name.to_uppercase();
        let values: Vec<String> = values.iter().map(|v| v.to_uppercase()).collect();

        if let Some(existing) = self.entries.get(&name) {
            if existing == &values {
                return Ok(());
            }
            return Err(SchemaError::enum_redefined(name));
        }

        if let Some((other_name, _)) = self
            .entries
            .iter()
            .find(|(other_name, other_values)| *other_name != &name && **other_values == values)
        {
            return Err(SchemaError::enum_duplicate_values(name, other_name.clone()));
        }

        self.entries.insert(name, values);
        Ok(())
    }

    /// Look up an enum's ordered values by case-folded name.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(&name.to_uppercase()).map(Vec::as_slice)
    }

    /// True iff `name` (case-insensitive) is registered.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_uppercase())
    }

    /// All registered entries, in insertion order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The registered names, in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_with_same_values_is_a_no_op() {
        let mut reg = EnumRegistry::new();
        let values = vec!["ADMIN".to_string(), "STUDENT".to_string()];
        reg.register("user_role", &values).unwrap();
        reg.register("USER_ROLE", &values).unwrap();
        assert_eq!(reg.get("user_role"), Some(values.as_slice()));
    }

    #[test]
    fn same_name_different_values_is_redefined_error() {
        let mut reg = EnumRegistry::new();
        reg.register("user_role", &["ADMIN".to_string()]).unwrap();
        let err = reg
            .register("user_role", &["ADMIN".to_string(), "STUDENT".to_string()])
            .unwrap_err();
        assert!(matches!(err, SchemaError::EnumRedefined { .. }));
    }

    #[test]
    fn different_name_same_values_is_duplicate_error() {
        let mut reg = EnumRegistry::new();
        let values = vec!["ADMIN".to_string(), "STUDENT".to_string()];
        reg.register("user_role", &values).unwrap();
        let err = reg.register("role_kind", &values).unwrap_err();
        assert!(matches!(err, SchemaError::EnumDuplicateValues { .. }));
    }

    #[test]
    fn registration_is_commutative_over_distinct_names() {
        let mut a = EnumRegistry::new();
        a.register("a", &["X".to_string()]).unwrap();
        a.register("b", &["Y".to_string()]).unwrap();

        let mut b = EnumRegistry::new();
        b.register("b", &["Y".to_string()]).unwrap();
        b.register("a", &["X".to_string()]).unwrap();

        assert_eq!(a.get("a"), b.get("a"));
        assert_eq!(a.get("b"), b.get("b"));
    }

    #[test]
    fn has_and_get_are_case_insensitive() {
        let mut reg = EnumRegistry::new();
        reg.register("UserRole", &["ADMIN".to_string()]).unwrap();
        assert!(reg.has("user_role"));
        assert!(reg.has("USER_ROLE"));
        assert_eq!(reg.get("UsEr_RoLe"), Some(["ADMIN".to_string()].as_slice()));
    }
}
