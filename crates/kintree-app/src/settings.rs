use crate::AppError;
use kintree_core::LayoutMode;
use kintree_graph::{ForceSettings, HierarchicalSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout_mode: LayoutMode,
    pub hierarchical: HierarchicalSettings,
    pub force: ForceSettings,
    /// Used whenever the host reports a zero or unusable viewport.
    pub min_width: f32,
    pub min_height: f32,
    pub ticks_per_frame: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout_mode: LayoutMode::default(),
            hierarchical: HierarchicalSettings::default(),
            force: ForceSettings::default(),
            min_width: 320.0,
            min_height: 240.0,
            ticks_per_frame: 1,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kintree").join("settings.json"))
    }

    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::info!("No config directory available, using default settings");
                Self::default()
            }
        }
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        tracing::info!("Loading settings from {:?}", path);
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    tracing::debug!("Settings loaded: {:?}", settings);
                    settings
                }
                Err(e) => {
                    tracing::error!("Failed to parse settings: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read settings file: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let path = Self::default_path().ok_or(AppError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(dir) = path.parent()
            && !dir.exists()
        {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn hierarchical_settings(&self) -> HierarchicalSettings {
        HierarchicalSettings {
            min_width: self.min_width,
            min_height: self.min_height,
            ..self.hierarchical
        }
    }

    pub fn force_settings(&self) -> ForceSettings {
        ForceSettings {
            min_width: self.min_width,
            min_height: self.min_height,
            ..self.force
        }
    }
}
