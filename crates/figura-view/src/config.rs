use std::path::Path;

use figura_anim::LoopMode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ViewerError};

pub const ENV_FOV_DEG: &str = "FIGURA_FOV_DEG";
pub const ENV_LOAD_TIMEOUT_SECS: &str = "FIGURA_LOAD_TIMEOUT_SECS";
pub const ENV_PARTICLES: &str = "FIGURA_PARTICLES";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationEntry {
    pub name: String,
    pub url: String,
}

/// Engine tuning. Every field has a default, so a config file only lists what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical field of view.
    pub fov_deg: f32,
    /// Below 1 the camera sits closer than a plain fit.
    pub tightness: f32,
    pub min_distance_factor: f32,
    pub max_distance_factor: f32,
    pub first_azimuth_deg: f32,
    pub first_elevation_deg: f32,
    /// Orbit target height as a fraction of model height.
    pub target_height_ratio: f32,
    pub swap_tween_secs: f32,
    pub load_timeout_secs: f32,
    /// Radians per pixel.
    pub orbit_sensitivity: f32,
    /// Exponent per wheel unit.
    pub zoom_sensitivity: f32,
    /// Fraction of the camera distance per pixel.
    pub pan_sensitivity: f32,
    /// Radians per pixel.
    pub spin_sensitivity: f32,
    pub particle_count: usize,
    pub particle_seed: u64,
    pub reframe_seed: u64,
    pub reframe_elevation_deg: [f32; 2],
    pub reframe_distance_factor: [f32; 2],
    pub animations: Vec<AnimationEntry>,
    pub loop_mode: LoopMode,
    pub environment_url: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_deg: 35.0,
            tightness: 0.85,
            min_distance_factor: 0.6,
            max_distance_factor: 8.0,
            first_azimuth_deg: 25.0,
            first_elevation_deg: 12.0,
            target_height_ratio: 0.55,
            swap_tween_secs: 0.6,
            load_timeout_secs: 30.0,
            orbit_sensitivity: 0.008,
            zoom_sensitivity: 0.0015,
            pan_sensitivity: 0.0015,
            spin_sensitivity: 0.01,
            particle_count: 160,
            particle_seed: 7,
            reframe_seed: 11,
            reframe_elevation_deg: [-5.0, 35.0],
            reframe_distance_factor: [0.8, 1.4],
            animations: Vec::new(),
            loop_mode: LoopMode::Repeat,
            environment_url: None,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ViewerError::Config(format!("{}: {err}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|err| ViewerError::Config(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `FIGURA_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_FOV_DEG) {
            self.fov_deg = parse_var(ENV_FOV_DEG, &value)?;
        }
        if let Some(value) = lookup(ENV_LOAD_TIMEOUT_SECS) {
            self.load_timeout_secs = parse_var(ENV_LOAD_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_PARTICLES) {
            self.particle_count = parse_var(ENV_PARTICLES, &value)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| Err(ViewerError::Config(message.to_string()));
        if !(self.fov_deg.is_finite() && self.fov_deg > 1.0 && self.fov_deg < 179.0) {
            return fail("fov_deg must lie between 1 and 179");
        }
        if !(self.tightness.is_finite() && self.tightness > 0.0) {
            return fail("tightness must be positive");
        }
        if !(self.min_distance_factor > 0.0 && self.min_distance_factor < self.max_distance_factor)
        {
            return fail("distance factors must satisfy 0 < min < max");
        }
        if !(self.load_timeout_secs.is_finite() && self.load_timeout_secs > 0.0) {
            return fail("load_timeout_secs must be positive");
        }
        if self.swap_tween_secs < 0.0 || !self.swap_tween_secs.is_finite() {
            return fail("swap_tween_secs must not be negative");
        }
        let [low, high] = self.reframe_distance_factor;
        if !(low > 0.0 && low <= high) {
            return fail("reframe_distance_factor must be an increasing positive range");
        }
        if self.reframe_elevation_deg[0] > self.reframe_elevation_deg[1] {
            return fail("reframe_elevation_deg must be an increasing range");
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    debug!(key, value, "config override");
    value
        .trim()
        .parse()
        .map_err(|_| ViewerError::Config(format!("{key}={value} is not a valid value")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        let config = ViewerConfig::default();
        config.validate()?;
        assert_eq!(config.fov_deg, 35.0);
        assert_eq!(config.load_timeout_secs, 30.0);
        Ok(())
    }

    #[test]
    fn partial_json_keeps_defaults() -> anyhow::Result<()> {
        let config: ViewerConfig = serde_json::from_str(
            r#"{ "tightness": 0.9, "loop_mode": "ping_pong",
                 "animations": [{ "name": "idle", "url": "anim/idle.vrma" }] }"#,
        )?;
        assert_eq!(config.tightness, 0.9);
        assert_eq!(config.loop_mode, LoopMode::PingPong);
        assert_eq!(config.animations.len(), 1);
        assert_eq!(config.swap_tween_secs, 0.6);
        Ok(())
    }

    #[test]
    fn overrides_apply_and_validate() -> Result<()> {
        let vars: HashMap<&str, &str> =
            [(ENV_FOV_DEG, "50"), (ENV_PARTICLES, "0")].into_iter().collect();
        let mut config = ViewerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()))?;
        assert_eq!(config.fov_deg, 50.0);
        assert_eq!(config.particle_count, 0);

        let err = config.apply_overrides(|key| (key == ENV_FOV_DEG).then(|| "wide".to_string()));
        assert!(matches!(err, Err(ViewerError::Config(_))));
        Ok(())
    }

    #[test]
    fn rejects_inverted_distance_bounds() {
        let config = ViewerConfig {
            min_distance_factor: 9.0,
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
