//! In-memory settings provider

use parking_lot::RwLock;

use super::settings::SettingsLayer;
use super::traits::{ConfigResult, SettingsProvider};

/// In-memory settings provider for testing and embedding
#[derive(Debug, Default)]
pub struct MemorySettingsProvider {
    layer: RwLock<SettingsLayer>,
}

impl MemorySettingsProvider {
    pub fn new(layer: SettingsLayer) -> Self {
        Self {
            layer: RwLock::new(layer),
        }
    }

    /// Replace the layer (useful for testing)
    pub fn set(&self, layer: SettingsLayer) {
        *self.layer.write() = layer;
    }
}

impl SettingsProvider for MemorySettingsProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> ConfigResult<SettingsLayer> {
        Ok(self.layer.read().clone())
    }
}
