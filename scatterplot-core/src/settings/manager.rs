use super::{
    load_settings_file, normalize_settings, parse_color_by, parse_render_mode, save_settings_file,
    ScatterplotSettings,
};
use std::path::{Path, PathBuf};

/// Current plugin settings plus the persisted defaults and factory files.
pub struct SettingsManager {
    pub settings: ScatterplotSettings,
    pub settings_dirty: bool,
    defaults: ScatterplotSettings,
    factory: ScatterplotSettings,
    defaults_path: PathBuf,
}

impl SettingsManager {
    const DEFAULTS_FILE: &'static str = "scatterplot_settings.defaults.json";
    const FACTORY_FILE: &'static str = "scatterplot_settings.factory.json";

    fn load_or_create(settings_dir: &Path) -> (ScatterplotSettings, ScatterplotSettings, PathBuf) {
        let defaults_path = settings_dir.join(Self::DEFAULTS_FILE);
        let factory_path = settings_dir.join(Self::FACTORY_FILE);
        let builtin = ScatterplotSettings::default();

        let factory = match load_settings_file(&factory_path) {
            Ok(settings) => settings,
            Err(err) => {
                log::debug!("{err}; writing built-in factory settings");
                if let Err(err) = save_settings_file(&factory_path, &builtin) {
                    log::warn!("{err}");
                }
                builtin
            }
        };

        let defaults = match load_settings_file(&defaults_path) {
            Ok(settings) => settings,
            Err(err) => {
                log::debug!("{err}; seeding defaults from factory settings");
                if let Err(err) = save_settings_file(&defaults_path, &factory) {
                    log::warn!("{err}");
                }
                factory.clone()
            }
        };

        (defaults, factory, defaults_path)
    }

    pub fn new(settings_dir: PathBuf) -> Self {
        let (defaults, factory, defaults_path) = Self::load_or_create(&settings_dir);
        Self {
            settings: defaults.clone(),
            settings_dirty: false,
            defaults,
            factory,
            defaults_path,
        }
    }

    pub fn apply_settings_json(&mut self, json: &str) -> Result<(), String> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON: {e}"))?;
        self.apply_settings_patch(&value)
    }

    /// Applies the recognised keys of a JSON object; unknown keys are errors.
    pub fn apply_settings_patch(&mut self, patch: &serde_json::Value) -> Result<(), String> {
        let obj = patch
            .as_object()
            .ok_or_else(|| "Settings patch must be a JSON object".to_string())?;

        let mut settings = self.settings.clone();
        for (key, value) in obj {
            match key.as_str() {
                "render_mode" => {
                    let mode = value
                        .as_str()
                        .ok_or_else(|| "render_mode must be a string".to_string())?;
                    settings.render_mode = parse_render_mode(mode)?;
                }
                "color_by" => {
                    let color_by = value
                        .as_str()
                        .ok_or_else(|| "color_by must be a string".to_string())?;
                    settings.color_by = parse_color_by(color_by)?;
                }
                "point_size" => settings.point_size = number(key, value)?,
                "point_opacity" => settings.point_opacity = number(key, value)?,
                "density_sigma" => settings.density_sigma = number(key, value)?,
                "continuous_updates" => settings.continuous_updates = boolean(key, value)?,
                "freeze_selection" => settings.freeze_selection = boolean(key, value)?,
                "x_dimension" => settings.x_dimension = index(key, value)?,
                "y_dimension" => settings.y_dimension = index(key, value)?,
                "color_dimension" => settings.color_dimension = index(key, value)?,
                "constant_color" | "background_color" => {
                    let color = serde_json::from_value(value.clone())
                        .map_err(|e| format!("{key} must be an rgb object: {e}"))?;
                    if key == "constant_color" {
                        settings.constant_color = color;
                    } else {
                        settings.background_color = color;
                    }
                }
                other => return Err(format!("Unknown setting '{other}'")),
            }
        }

        self.settings = normalize_settings(settings)?;
        self.settings_dirty = true;
        Ok(())
    }

    pub fn update_defaults(&mut self, settings: ScatterplotSettings) -> Result<(), String> {
        let normalized = normalize_settings(settings)?;
        save_settings_file(&self.defaults_path, &normalized)?;
        self.defaults = normalized;
        Ok(())
    }

    /// Stores the current settings as the new defaults.
    pub fn persist_current(&mut self) -> Result<(), String> {
        self.update_defaults(self.settings.clone())?;
        self.settings_dirty = false;
        Ok(())
    }

    pub fn reset_defaults_to_factory(&mut self) -> Result<(), String> {
        let factory = self.factory.clone();
        save_settings_file(&self.defaults_path, &factory)?;
        self.defaults = factory.clone();
        self.settings = factory;
        self.settings_dirty = false;
        Ok(())
    }

    pub fn defaults(&self) -> &ScatterplotSettings {
        &self.defaults
    }

    pub fn factory(&self) -> &ScatterplotSettings {
        &self.factory
    }
}

fn number(key: &str, value: &serde_json::Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("{key} must be a number"))
}

fn boolean(key: &str, value: &serde_json::Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("{key} must be a boolean"))
}

fn index(key: &str, value: &serde_json::Value) -> Result<usize, String> {
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| format!("{key} must be a non-negative integer"))
}
