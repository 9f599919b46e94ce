use crate::error::{CoreError, Result};

/// Tunables shared by every component of a [`crate::StereoCore`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// Physical eye separation in meters. Zero disables stereo.
    pub ipd: f32,
    /// Scale applied to the viewer relative to the virtual world.
    pub viewer_scale: f32,
    /// Fade between mono and stereo as the head appears and disappears.
    pub enable_auto_stereo: bool,
    /// Seconds the head must stay invisible before fading back to mono.
    pub auto_stereo_delay: f32,
    /// Seconds taken by a mono/stereo fade.
    pub auto_stereo_duration: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ipd: 0.06,
            viewer_scale: 1.0,
            enable_auto_stereo: true,
            auto_stereo_delay: 5.0,
            auto_stereo_duration: 1.0,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.ipd.is_finite() || self.ipd < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "ipd must be a non-negative number of meters, got {}",
                self.ipd
            )));
        }
        if !self.viewer_scale.is_finite() || self.viewer_scale <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "viewer_scale must be positive, got {}",
                self.viewer_scale
            )));
        }
        if !self.auto_stereo_delay.is_finite() || self.auto_stereo_delay < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "auto_stereo_delay must be non-negative, got {}",
                self.auto_stereo_delay
            )));
        }
        if !self.auto_stereo_duration.is_finite() || self.auto_stereo_duration < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "auto_stereo_duration must be non-negative, got {}",
                self.auto_stereo_duration
            )));
        }
        Ok(())
    }
}
