//! Table of platform definitions passed explicitly into session construction.

use indexmap::IndexMap;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::error::{PlatformError, Result};

/// Table of platform definitions, keyed by name, in registration order.
///
/// There is no process-wide registry: build a table, add your own
/// platforms, and hand it to the [`SessionBuilder`](crate::SessionBuilder).
#[derive(Debug, Clone, Default)]
pub struct PlatformTable {
    platforms: IndexMap<String, PlatformDefinition>,
}

impl PlatformTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            platforms: IndexMap::new(),
        }
    }

    /// Table holding the built-in platforms.
    pub fn builtin() -> Result<Self> {
        let mut table = Self::new();
        for platform in vendors::builtin()? {
            table.register(platform)?;
        }
        Ok(table)
    }

    /// Register a platform definition.
    pub fn register(&mut self, platform: PlatformDefinition) -> Result<()> {
        if self.platforms.contains_key(&platform.name) {
            return Err(PlatformError::AlreadyRegistered {
                name: platform.name.clone(),
            }
            .into());
        }
        self.platforms.insert(platform.name.clone(), platform);
        Ok(())
    }

    /// Insert or replace a platform definition, returning the previous one.
    pub fn replace(&mut self, platform: PlatformDefinition) -> Option<PlatformDefinition> {
        self.platforms.insert(platform.name.clone(), platform)
    }

    /// Get a platform by name.
    pub fn get(&self, name: &str) -> Option<&PlatformDefinition> {
        self.platforms.get(name)
    }

    /// Get a platform by name, failing with `PlatformError::UnknownPlatform`.
    pub fn lookup(&self, name: &str) -> Result<&PlatformDefinition> {
        self.get(name).ok_or_else(|| {
            PlatformError::UnknownPlatform {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Check if a platform is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.platforms.contains_key(name)
    }

    /// List all registered platform names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.platforms.keys()
    }

    /// Get a mutable reference to a platform.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PlatformDefinition> {
        self.platforms.get_mut(name)
    }

    /// Number of registered platforms.
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_builtin_names_in_order() {
        let table = PlatformTable::builtin().unwrap();
        let names: Vec<&str> = table.names().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["linux", "cisco_iosxe", "arista_eos", "juniper_junos"]
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut table = PlatformTable::new();
        table
            .register(PlatformDefinition::new("lab", "lab#").unwrap())
            .unwrap();
        let err = table
            .register(PlatformDefinition::new("lab", "lab>").unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::AlreadyRegistered { .. })
        ));

        let previous = table.replace(PlatformDefinition::new("lab", "lab>").unwrap());
        assert!(previous.is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lookup_unknown() {
        let table = PlatformTable::new();
        assert!(table.is_empty());
        let err = table.lookup("nxos").unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::UnknownPlatform { ref name }) if name == "nxos"
        ));
    }
}
