//! Static registry mapping platform names to capability records.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;

use super::definition::PlatformProfile;
use super::vendors;

/// Built-in registry, populated on first use.
static REGISTRY: LazyLock<PlatformRegistry> = LazyLock::new(PlatformRegistry::builtin);

/// Registry of platform profiles keyed by canonical name, with alias lookup.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: IndexMap<String, Arc<PlatformProfile>>,
    aliases: HashMap<String, String>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the built-in registry.
    pub fn global() -> &'static PlatformRegistry {
        &REGISTRY
    }

    /// Build a registry holding every built-in platform.
    fn builtin() -> Self {
        let mut registry = Self::new();
        for profile in vendors::builtin_platforms() {
            registry.register(profile);
        }
        registry
    }

    /// Register a profile under its canonical name and aliases.
    ///
    /// A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, profile: PlatformProfile) {
        for alias in &profile.aliases {
            self.aliases.insert(alias.clone(), profile.name.clone());
        }
        self.platforms
            .insert(profile.name.clone(), Arc::new(profile));
    }

    /// Look up a profile by canonical name or alias.
    pub fn get(&self, name: &str) -> Option<&Arc<PlatformProfile>> {
        let name = name.trim();
        self.platforms.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|canonical| self.platforms.get(canonical))
        })
    }

    /// Resolve a platform name to a profile.
    ///
    /// Names the registry does not know are passed through verbatim with a
    /// generic profile instead of being rejected.
    pub fn resolve(&self, name: &str) -> Arc<PlatformProfile> {
        match self.get(name) {
            Some(profile) => profile.clone(),
            None => Arc::new(PlatformProfile::passthrough(name.trim())),
        }
    }

    /// Check if a name or alias is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// List all canonical platform names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.platforms.keys()
    }
}
