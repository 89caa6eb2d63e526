use std::fs;

use blackjack_sim::SimulationRequest;

pub mod presets;

/// On-disk shape of the driver's config file: a [`SimulationRequest`] plus
/// the handful of fields that only make sense for a CLI run (how many
/// worker threads to fan out across, and whether to seed the request with
/// the built-in Illustrious 18 + Fab 4 deviations and default bet ramp).
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub request: SimulationRequest,
    pub threads: usize,
    pub use_illustrious_18_fab_4: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            request: SimulationRequest::default(),
            threads: num_cpus(),
            use_illustrious_18_fab_4: false,
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Config {
    /// Applies the bundled presets requested in the config, without
    /// clobbering any deviations the user already listed explicitly.
    pub fn with_presets_applied(mut self) -> Self {
        if self.use_illustrious_18_fab_4 {
            self.request.deviations.extend(presets::illustrious_18_fab_4());
            if self.request.bet_ramp.steps.len() <= 1 {
                self.request.bet_ramp = presets::default_ramp();
            }
        }
        self
    }
}

/// Reads the content of a given config file and parses it to a Config.
///
/// Panics if any error occurs.
pub fn parse_config_from_file(filename: &str) -> Config {
    let file_content = fs::read_to_string(filename).unwrap();
    let config: Config = serde_yaml::from_str(&file_content).unwrap();
    config.with_presets_applied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates_as_a_request() {
        let config = Config::default();
        assert!(config.request.validate().is_ok());
    }

    #[test]
    fn presets_are_applied_only_when_requested() {
        let mut config = Config::default();
        config.use_illustrious_18_fab_4 = true;
        let config = config.with_presets_applied();
        assert!(!config.request.deviations.is_empty());
    }
}
