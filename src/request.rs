use serde::{Deserialize, Serialize};

use crate::betting::BetRamp;
use crate::counting::{CountingSystem, DeckEstimationRounding};
use crate::deviation::Deviation;
use crate::error::ValidationError;
use crate::rules::Rules;

/// Full simulation input (spec.md §3 "SimulationRequest", §6 validation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationRequest {
    pub rules: Rules,
    pub counting_system: CountingSystem,
    pub deviations: Vec<Deviation>,
    pub bet_ramp: BetRamp,
    pub bankroll: Option<f64>,
    pub unit_size: f64,
    pub hands: u64,
    pub seed: u64,
    pub processes: u32,
    pub debug_log: bool,
    pub debug_log_hands: usize,
    pub deck_estimation_step: f64,
    pub deck_estimation_rounding: DeckEstimationRounding,
    pub use_estimated_tc_for_bet: bool,
    pub use_estimated_tc_for_deviations: bool,
    pub hands_per_hour: f64,
}

impl Default for SimulationRequest {
    fn default() -> Self {
        SimulationRequest {
            rules: Rules::default(),
            counting_system: CountingSystem::default(),
            deviations: Vec::new(),
            bet_ramp: BetRamp {
                steps: vec![crate::betting::BetRampEntry {
                    tc_floor: 0,
                    units: 1.0,
                }],
                wong_out_below: None,
                wong_out_policy: Default::default(),
            },
            bankroll: None,
            unit_size: 10.0,
            hands: 2_000_000,
            seed: 42,
            processes: 4,
            debug_log: false,
            debug_log_hands: 20,
            deck_estimation_step: 1.0,
            deck_estimation_rounding: DeckEstimationRounding::Floor,
            use_estimated_tc_for_bet: true,
            use_estimated_tc_for_deviations: true,
            hands_per_hour: 100.0,
        }
    }
}

impl SimulationRequest {
    /// Validates and sorts the bet ramp in place; raised before the engine
    /// ever runs (spec.md §6, §7).
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.rules.validate()?;
        if self.bet_ramp.steps.is_empty() {
            return Err(ValidationError::EmptyRamp);
        }
        self.bet_ramp = self
            .bet_ramp
            .normalized()
            .map_err(ValidationError::DuplicateRampStep)?;
        if self.hands < 100 {
            return Err(ValidationError::Hands(self.hands));
        }
        if self.hands_per_hour <= 0.0 {
            return Err(ValidationError::HandsPerHour(self.hands_per_hour));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_request_validates() {
        assert!(SimulationRequest::default().validate().is_ok());
    }

    #[test]
    fn too_few_hands_is_rejected() {
        let req = SimulationRequest {
            hands: 50,
            ..SimulationRequest::default()
        };
        assert_eq!(req.validate().unwrap_err(), ValidationError::Hands(50));
    }

    #[test]
    fn duplicate_ramp_floor_is_rejected() {
        let req = SimulationRequest {
            bet_ramp: BetRamp {
                steps: vec![
                    crate::betting::BetRampEntry {
                        tc_floor: 0,
                        units: 1.0,
                    },
                    crate::betting::BetRampEntry {
                        tc_floor: 0,
                        units: 2.0,
                    },
                ],
                wong_out_below: None,
                wong_out_policy: Default::default(),
            },
            ..SimulationRequest::default()
        };
        assert_eq!(
            req.validate().unwrap_err(),
            ValidationError::DuplicateRampStep(0)
        );
    }
}
