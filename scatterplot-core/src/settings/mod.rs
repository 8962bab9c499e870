pub mod manager;

pub use manager::SettingsManager;

use crate::validation::Validator;
use datasets::Rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Scatter,
    Density,
    Contour,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBy {
    #[default]
    Constant,
    Data,
}

pub const RENDER_MODES: [&str; 3] = ["scatter", "density", "contour"];
pub const COLOR_BY_OPTIONS: [&str; 2] = ["constant", "data"];
pub const POINT_SIZE_RANGE: (f64, f64) = (1.0, 50.0);
pub const POINT_OPACITY_RANGE: (f64, f64) = (0.0, 100.0);
pub const DENSITY_SIGMA_RANGE: (f64, f64) = (0.01, 0.5);
pub const DEFAULT_POINT_SIZE: f64 = 10.0;
pub const DEFAULT_POINT_OPACITY: f64 = 50.0;
pub const DEFAULT_DENSITY_SIGMA: f64 = 0.15;
pub const DEFAULT_CONSTANT_COLOR: Rgb = Rgb::new(93.0 / 255.0, 93.0 / 255.0, 225.0 / 255.0);
pub const DEFAULT_BACKGROUND_COLOR: Rgb = Rgb::WHITE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterplotSettings {
    pub render_mode: RenderMode,
    pub point_size: f64,
    pub point_opacity: f64,
    pub density_sigma: f64,
    pub continuous_updates: bool,
    pub color_by: ColorBy,
    pub color_dimension: usize,
    pub constant_color: Rgb,
    pub background_color: Rgb,
    pub x_dimension: usize,
    pub y_dimension: usize,
    pub freeze_selection: bool,
}

impl Default for ScatterplotSettings {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Scatter,
            point_size: DEFAULT_POINT_SIZE,
            point_opacity: DEFAULT_POINT_OPACITY,
            density_sigma: DEFAULT_DENSITY_SIGMA,
            continuous_updates: true,
            color_by: ColorBy::Constant,
            color_dimension: 0,
            constant_color: DEFAULT_CONSTANT_COLOR,
            background_color: DEFAULT_BACKGROUND_COLOR,
            x_dimension: 0,
            y_dimension: 1,
            freeze_selection: false,
        }
    }
}

impl ScatterplotSettings {
    /// Opacity as a 0..1 factor for the renderer.
    pub fn opacity_factor(&self) -> f64 {
        self.point_opacity / POINT_OPACITY_RANGE.1
    }
}

pub fn normalize_settings(mut settings: ScatterplotSettings) -> Result<ScatterplotSettings, String> {
    settings.point_size = Validator::clamp_to_range(
        Validator::require_finite("point_size", settings.point_size)?,
        POINT_SIZE_RANGE,
    );
    settings.point_opacity = Validator::clamp_to_range(
        Validator::require_finite("point_opacity", settings.point_opacity)?,
        POINT_OPACITY_RANGE,
    );
    settings.density_sigma = Validator::clamp_to_range(
        Validator::require_finite("density_sigma", settings.density_sigma)?,
        DENSITY_SIGMA_RANGE,
    );
    Ok(settings)
}

pub fn parse_render_mode(value: &str) -> Result<RenderMode, String> {
    if !Validator::validate_option(value, &RENDER_MODES) {
        return Err("render_mode must be 'scatter', 'density', or 'contour'".to_string());
    }
    Ok(match value {
        "density" => RenderMode::Density,
        "contour" => RenderMode::Contour,
        _ => RenderMode::Scatter,
    })
}

pub fn parse_color_by(value: &str) -> Result<ColorBy, String> {
    if !Validator::validate_option(value, &COLOR_BY_OPTIONS) {
        return Err("color_by must be 'constant' or 'data'".to_string());
    }
    Ok(match value {
        "data" => ColorBy::Data,
        _ => ColorBy::Constant,
    })
}

pub fn load_settings_file(path: &Path) -> Result<ScatterplotSettings, String> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read settings file '{}': {e}", path.display()))?;
    let settings: ScatterplotSettings = serde_json::from_slice(&data)
        .map_err(|e| format!("Failed to parse settings file '{}': {e}", path.display()))?;
    normalize_settings(settings)
}

pub fn save_settings_file(path: &Path, settings: &ScatterplotSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let data = serde_json::to_vec_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    std::fs::write(path, data)
        .map_err(|e| format!("Failed to write settings file '{}': {e}", path.display()))
}
