//! Per-entity configuration registry with defaults fallback.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::warn;

use stockcast_core::{EngineResult, EntityConfig, EntityId};

/// Registry of per-entity configuration.
///
/// An invalid entry is rejected at registration and the entity keeps the
/// defaults — configuration errors are scoped to one entity, never fatal
/// for the process.
#[derive(Debug)]
pub struct ConfigRegistry {
    defaults: EntityConfig,
    overrides: RwLock<HashMap<EntityId, EntityConfig>>,
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new(EntityConfig::default())
    }
}

impl ConfigRegistry {
    pub fn new(defaults: EntityConfig) -> Self {
        Self {
            defaults,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Register per-entity configuration; invalid configuration is refused
    /// and the entity stays on defaults.
    pub fn set(&self, entity_id: EntityId, config: EntityConfig) -> EngineResult<()> {
        if let Err(e) = config.validate() {
            warn!(entity = %entity_id, error = %e, "rejecting entity configuration, keeping defaults");
            return Err(e);
        }
        if let Ok(mut map) = self.overrides.write() {
            map.insert(entity_id, config);
        }
        Ok(())
    }

    pub fn config_for(&self, entity_id: EntityId) -> EntityConfig {
        self.overrides
            .read()
            .ok()
            .and_then(|map| map.get(&entity_id).cloned())
            .unwrap_or_else(|| self.defaults.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcast_core::EngineError;

    #[test]
    fn unknown_entities_get_defaults() {
        let registry = ConfigRegistry::default();
        let cfg = registry.config_for(EntityId::new());
        assert_eq!(cfg, EntityConfig::default());
    }

    #[test]
    fn invalid_override_is_refused_and_defaults_remain() {
        let registry = ConfigRegistry::default();
        let e = EntityId::new();
        let bad = EntityConfig::default().with_horizon(0);

        assert!(matches!(
            registry.set(e, bad),
            Err(EngineError::Configuration(_))
        ));
        assert_eq!(registry.config_for(e), EntityConfig::default());
    }

    #[test]
    fn valid_override_takes_effect() {
        let registry = ConfigRegistry::default();
        let e = EntityId::new();
        let cfg = EntityConfig::default().with_horizon(7);
        registry.set(e, cfg.clone()).unwrap();
        assert_eq!(registry.config_for(e), cfg);
    }
}
