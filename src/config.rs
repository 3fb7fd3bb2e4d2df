//! Construction-time simulation settings. Nothing here is reconfigurable at
//! runtime; a session is built from one validated config and keeps it for its
//! lifetime.

use anyhow::bail;

/// Default simulation grid resolution (independent of the viewport).
pub const DEFAULT_GRID_SIZE: u32 = 512;

/// Diffusion rate constant applied to the neighbor-average delta.
pub const DEFAULT_DIFFUSE_RATE: f32 = 2.0;

/// Per-tick energy loss. Must stay below 1.0 or the field blows up.
pub const DEFAULT_DECAY_RATE: f32 = 0.8;

pub const DEFAULT_DROP_RADIUS: f32 = 0.05;
pub const DEFAULT_DROP_STRENGTH: f32 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct RippleConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    pub diffuse_rate: f32,
    pub decay_rate: f32,
    /// Radius/strength used for pointer and idle-animation drops.
    pub drop_radius: f32,
    pub drop_strength: f32,
    /// Color stops blended by the point renderer (low and high energy).
    pub color1: [f32; 3],
    pub color2: [f32; 3],
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_SIZE,
            grid_height: DEFAULT_GRID_SIZE,
            diffuse_rate: DEFAULT_DIFFUSE_RATE,
            decay_rate: DEFAULT_DECAY_RATE,
            drop_radius: DEFAULT_DROP_RADIUS,
            drop_strength: DEFAULT_DROP_STRENGTH,
            color1: [0.149, 0.141, 0.912],
            color2: [1.0, 0.833, 0.224],
        }
    }
}

impl RippleConfig {
    /// Aspect ratio of the simulation grid (width over height).
    pub fn grid_ratio(&self) -> f32 {
        self.grid_width as f32 / self.grid_height as f32
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.grid_width == 0 || self.grid_height == 0 {
            bail!(
                "invalid grid resolution {}x{}: both dimensions must be positive",
                self.grid_width,
                self.grid_height
            );
        }
        if !(self.decay_rate > 0.0 && self.decay_rate < 1.0) {
            bail!(
                "decay rate {} is outside (0, 1); values >= 1 grow without bound",
                self.decay_rate
            );
        }
        if self.diffuse_rate <= 0.0 {
            bail!("diffuse rate {} must be positive", self.diffuse_rate);
        }
        if self.drop_radius <= 0.0 || self.drop_strength <= 0.0 {
            bail!(
                "default drop radius/strength {}/{} must be positive",
                self.drop_radius,
                self.drop_strength
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        RippleConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let cfg = RippleConfig {
            grid_width: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RippleConfig {
            grid_height: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unstable_decay_is_rejected() {
        let cfg = RippleConfig {
            decay_rate: 1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RippleConfig {
            decay_rate: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn grid_ratio_follows_dimensions() {
        let cfg = RippleConfig {
            grid_width: 1024,
            grid_height: 512,
            ..Default::default()
        };
        assert_eq!(cfg.grid_ratio(), 2.0);
    }
}
