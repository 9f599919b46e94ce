use anyhow::bail;
use clap::{Parser, ValueEnum};
use stereo_core::{CoreConfig, TickMode};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Play,
    Edit,
}

impl From<Mode> for TickMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Play => TickMode::Play,
            Mode::Edit => TickMode::Edit,
        }
    }
}

/// `stereo_sim` - Drives the stereo display core against a simulated tracked
/// display.
///
/// A scripted viewer walks in and out of the tracking volume while a stylus
/// clicks its buttons, so the auto-stereo fades and tracker events can be
/// observed in the logs and on the metrics endpoint.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Frames per second of the simulated render loop.
    #[arg(long, env = "STEREO_SIM_TICK_HZ", default_value_t = 60)]
    pub tick_hz: u32,

    /// Stop after this many seconds. Runs until Ctrl-C when omitted.
    #[arg(long, env = "STEREO_SIM_DURATION_SECS")]
    pub duration_secs: Option<f64>,

    /// Whether the host is playing the scene or editing it.
    #[arg(long, env = "STEREO_SIM_MODE", value_enum, default_value_t = Mode::Play)]
    pub mode: Mode,

    /// Eye separation in meters.
    #[arg(long, env = "STEREO_SIM_IPD", default_value_t = 0.06)]
    pub ipd: f32,

    #[arg(long, env = "STEREO_SIM_VIEWER_SCALE", default_value_t = 1.0)]
    pub viewer_scale: f32,

    /// Seconds without a tracked head before fading back to mono.
    #[arg(long, env = "STEREO_SIM_AUTO_STEREO_DELAY", default_value_t = 5.0)]
    pub auto_stereo_delay: f32,

    /// Seconds taken by a mono/stereo fade.
    #[arg(long, env = "STEREO_SIM_AUTO_STEREO_DURATION", default_value_t = 1.0)]
    pub auto_stereo_duration: f32,

    /// Keep the display in stereo regardless of head tracking.
    #[arg(long, env = "STEREO_SIM_DISABLE_AUTO_STEREO")]
    pub disable_auto_stereo: bool,

    /// Seconds the simulated viewer stays in front of the display per cycle.
    #[arg(long, env = "STEREO_SIM_HEAD_PRESENT_SECS", default_value_t = 8.0)]
    pub head_present_secs: f64,

    /// Seconds the simulated viewer is away per cycle.
    #[arg(long, env = "STEREO_SIM_HEAD_ABSENT_SECS", default_value_t = 7.0)]
    pub head_absent_secs: f64,

    /// Probability in `[0, 1]` that any single provider query fails for a frame.
    #[arg(long, env = "STEREO_SIM_FAILURE_RATE", default_value_t = 0.0)]
    pub failure_rate: f64,

    /// Seed for the simulated device. Random when omitted.
    #[arg(long, env = "STEREO_SIM_SEED")]
    pub seed: Option<u64>,

    /// Listen address for the Prometheus metrics server. Disabled when omitted.
    #[arg(long, env = "STEREO_SIM_METRICS_LISTEN_ADDR")]
    pub metrics_listen_addr: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_hz == 0 || self.tick_hz > 1000 {
            bail!("STEREO_SIM_TICK_HZ must be between 1 and 1000");
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            bail!("STEREO_SIM_FAILURE_RATE must be between 0 and 1");
        }
        if self.head_present_secs <= 0.0 || self.head_absent_secs < 0.0 {
            bail!("head presence cycle must have a positive present phase");
        }
        if let Some(duration) = self.duration_secs {
            if !duration.is_finite() || duration <= 0.0 {
                bail!("STEREO_SIM_DURATION_SECS must be positive");
            }
        }
        self.core_config().validate()?;
        Ok(())
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            ipd: self.ipd,
            viewer_scale: self.viewer_scale,
            enable_auto_stereo: !self.disable_auto_stereo,
            auto_stereo_delay: self.auto_stereo_delay,
            auto_stereo_duration: self.auto_stereo_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_validate() {
        let config = Config::try_parse_from(["stereo_sim"]).unwrap();
        config.validate().unwrap();
        assert_eq!(config.mode, Mode::Play);
        assert_eq!(config.core_config(), CoreConfig::default());
    }

    #[test]
    fn flags_map_onto_core_config() {
        let config = Config::try_parse_from([
            "stereo_sim",
            "--ipd",
            "0.065",
            "--disable-auto-stereo",
            "--mode",
            "edit",
        ])
        .unwrap();
        let core = config.core_config();
        assert_eq!(core.ipd, 0.065);
        assert!(!core.enable_auto_stereo);
        assert_eq!(TickMode::from(config.mode), TickMode::Edit);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let config = Config::try_parse_from(["stereo_sim", "--failure-rate", "1.5"]).unwrap();
        assert!(config.validate().is_err());

        let config = Config::try_parse_from(["stereo_sim", "--viewer-scale", "0"]).unwrap();
        assert!(config.validate().is_err());
    }
}
