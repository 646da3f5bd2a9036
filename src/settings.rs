use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How mouse motion is interpreted while flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Rotate the camera itself; the aim target orbits around it.
    Camera,
    /// Orbit the camera around the aim target's world position.
    Aim,
}

impl RotationMode {
    pub fn toggled(self) -> Self {
        match self {
            RotationMode::Camera => RotationMode::Aim,
            RotationMode::Aim => RotationMode::Camera,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RotationMode::Camera => "Camera",
            RotationMode::Aim => "Aim",
        }
    }
}

/// Flight configuration. Persists across sessions; mutated in-session only
/// through the clamped operations below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlySettings {
    #[serde(default = "FlySettings::default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "FlySettings::default_rotate_speed_deg")]
    pub rotate_speed_deg: f32,
    #[serde(default = "FlySettings::default_aim_distance_step")]
    pub aim_distance_step: f32,
    #[serde(default = "FlySettings::default_rotation_mode")]
    pub rotation_mode: RotationMode,
    /// Name of the camera object a lost session may re-resolve from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_camera: Option<String>,
}

impl Default for FlySettings {
    fn default() -> Self {
        Self {
            move_speed: Self::default_move_speed(),
            rotate_speed_deg: Self::default_rotate_speed_deg(),
            aim_distance_step: Self::default_aim_distance_step(),
            rotation_mode: Self::default_rotation_mode(),
            active_camera: None,
        }
    }
}

impl FlySettings {
    pub const MOVE_SPEED_MIN: f32 = 0.01;
    pub const MOVE_SPEED_MAX: f32 = 100.0;
    pub const ROTATE_SPEED_MIN: f32 = 0.1;
    pub const ROTATE_SPEED_MAX: f32 = 90.0;
    pub const AIM_STEP_MIN: f32 = 0.01;
    pub const AIM_STEP_MAX: f32 = 10.0;

    const fn default_move_speed() -> f32 {
        0.1
    }

    const fn default_rotate_speed_deg() -> f32 {
        5.0
    }

    const fn default_aim_distance_step() -> f32 {
        0.2
    }

    const fn default_rotation_mode() -> RotationMode {
        RotationMode::Aim
    }

    /// Clamps every field into its documented range.
    pub fn sanitize(&mut self) {
        self.move_speed = self.move_speed.clamp(Self::MOVE_SPEED_MIN, Self::MOVE_SPEED_MAX);
        self.rotate_speed_deg =
            self.rotate_speed_deg.clamp(Self::ROTATE_SPEED_MIN, Self::ROTATE_SPEED_MAX);
        self.aim_distance_step =
            self.aim_distance_step.clamp(Self::AIM_STEP_MIN, Self::AIM_STEP_MAX);
    }

    /// Scales the move speed, clamped into range. Used by the shift/ctrl
    /// one-shot triggers (×2.0 and ×0.5).
    pub fn apply_speed_multiplier(&mut self, multiplier: f32) {
        self.move_speed =
            (self.move_speed * multiplier).clamp(Self::MOVE_SPEED_MIN, Self::MOVE_SPEED_MAX);
    }

    pub fn toggle_rotation_mode(&mut self) -> RotationMode {
        self.rotation_mode = self.rotation_mode.toggled();
        self.rotation_mode
    }

    pub fn rotate_speed_radians(&self) -> f32 {
        self.rotate_speed_deg.to_radians()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let mut settings: FlySettings = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("Settings load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn move_speed_saturates_under_repeated_doubling() {
        let mut settings = FlySettings::default();
        for _ in 0..20 {
            settings.apply_speed_multiplier(2.0);
        }
        assert_eq!(settings.move_speed, FlySettings::MOVE_SPEED_MAX);
        for _ in 0..40 {
            settings.apply_speed_multiplier(0.5);
        }
        assert_eq!(settings.move_speed, FlySettings::MOVE_SPEED_MIN);
    }

    #[test]
    fn toggling_rotation_mode_round_trips() {
        let mut settings = FlySettings::default();
        assert_eq!(settings.rotation_mode, RotationMode::Aim);
        assert_eq!(settings.toggle_rotation_mode(), RotationMode::Camera);
        assert_eq!(settings.toggle_rotation_mode(), RotationMode::Aim);
    }

    #[test]
    fn loaded_settings_are_clamped() {
        let mut temp = NamedTempFile::new().expect("temp settings file");
        write!(temp, r#"{{"move_speed": 1000.0, "rotate_speed_deg": 0.0, "aim_distance_step": 0.2}}"#)
            .expect("write settings");
        let settings = FlySettings::load(temp.path()).expect("load settings");
        assert_eq!(settings.move_speed, FlySettings::MOVE_SPEED_MAX);
        assert_eq!(settings.rotate_speed_deg, FlySettings::ROTATE_SPEED_MIN);
        assert_eq!(settings.rotation_mode, RotationMode::Aim);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = FlySettings::load_or_default("/nonexistent/fly_settings.json");
        assert_eq!(settings.move_speed, 0.1);
        assert_eq!(settings.aim_distance_step, 0.2);
    }
}
