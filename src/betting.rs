use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

/// One step of the bet ramp: "bet `units` once true count reaches `tc_floor`."
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetRampEntry {
    pub tc_floor: i32,
    pub units: f64,
}

/// When to enter the wonged-out (no-play) state once the count drops below
/// `wong_out_below` (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum WongOutPolicy {
    Anytime,
    AfterLossOnly,
    AfterHandOnly,
}

impl Default for WongOutPolicy {
    fn default() -> Self {
        WongOutPolicy::Anytime
    }
}

/// Ordered bet ramp plus Wong-out configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRamp {
    pub steps: Vec<BetRampEntry>,
    pub wong_out_below: Option<i32>,
    #[serde(default)]
    pub wong_out_policy: WongOutPolicy,
}

impl BetRamp {
    /// Sorts steps by ascending tc_floor and rejects duplicate floors.
    pub fn normalized(mut self) -> Result<Self, i32> {
        self.steps.sort_by_key(|s| s.tc_floor);
        for pair in self.steps.windows(2) {
            if pair[0].tc_floor == pair[1].tc_floor {
                return Err(pair[0].tc_floor);
            }
        }
        Ok(self)
    }

    /// Walks the ramp in ascending tc_floor order, selecting the last step
    /// whose floor is at or below `floor(tc_for_bet)`; falls back to the
    /// first entry if none qualifies (spec.md §4.3).
    pub fn choose_bet(&self, tc_for_bet: f64, unit_size: f64) -> f64 {
        let floor_tc = tc_for_bet.floor() as i32;
        let mut selected = None;
        for step in &self.steps {
            if floor_tc >= step.tc_floor {
                selected = Some(step);
            } else {
                break;
            }
        }
        let step = selected.unwrap_or(&self.steps[0]);
        step.units * unit_size
    }
}

/// Tracks whether the shoe's current count has put us in the "wonged out"
/// (not playing) state, per the three re-entry policies of spec.md §4.3.
#[derive(Debug, Clone, Default)]
pub struct WongOutTracker {
    is_wonged_out: bool,
    last_round_result: Option<RoundResult>,
    last_round_played: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResult {
    Win,
    Loss,
    Push,
}

impl WongOutTracker {
    /// Returns true if this round should be skipped (burn two cards, no bet).
    /// `floor_tc` is `floor(tc_for_bet)`.
    pub fn should_skip(&mut self, floor_tc: i32, ramp: &BetRamp) -> bool {
        let Some(wong_out_below) = ramp.wong_out_below else {
            return false;
        };
        if floor_tc >= wong_out_below {
            self.is_wonged_out = false;
            return false;
        }
        if !self.is_wonged_out {
            self.is_wonged_out = match ramp.wong_out_policy {
                WongOutPolicy::Anytime => true,
                WongOutPolicy::AfterLossOnly => self.last_round_result == Some(RoundResult::Loss),
                WongOutPolicy::AfterHandOnly => self.last_round_played,
            };
        }
        if self.is_wonged_out {
            self.last_round_played = false;
            true
        } else {
            false
        }
    }

    pub fn record_round(&mut self, result: RoundResult) {
        self.last_round_result = Some(result);
        self.last_round_played = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(steps: Vec<(i32, f64)>, wong_out_below: Option<i32>, policy: WongOutPolicy) -> BetRamp {
        BetRamp {
            steps: steps
                .into_iter()
                .map(|(tc_floor, units)| BetRampEntry { tc_floor, units })
                .collect(),
            wong_out_below,
            wong_out_policy: policy,
        }
    }

    #[test]
    fn below_minimum_step_uses_first_entry() {
        let r = ramp(vec![(0, 2.0), (2, 4.0)], None, WongOutPolicy::Anytime);
        assert_eq!(r.choose_bet(-5.0, 10.0), 20.0);
    }

    #[test]
    fn selects_last_qualifying_step() {
        let r = ramp(
            vec![(-1, 1.0), (0, 2.0), (2, 4.0)],
            None,
            WongOutPolicy::Anytime,
        );
        assert_eq!(r.choose_bet(1.9, 5.0), 10.0);
        assert_eq!(r.choose_bet(2.0, 5.0), 20.0);
    }

    #[test]
    fn no_wong_out_threshold_never_skips() {
        let r = ramp(vec![(0, 1.0)], None, WongOutPolicy::Anytime);
        let mut tracker = WongOutTracker::default();
        assert!(!tracker.should_skip(-10, &r));
    }

    #[test]
    fn anytime_policy_enters_immediately() {
        let r = ramp(vec![(0, 1.0)], Some(0), WongOutPolicy::Anytime);
        let mut tracker = WongOutTracker::default();
        assert!(tracker.should_skip(-1, &r));
    }

    #[test]
    fn after_loss_only_requires_a_prior_loss() {
        let r = ramp(vec![(0, 1.0)], Some(0), WongOutPolicy::AfterLossOnly);
        let mut tracker = WongOutTracker::default();
        assert!(!tracker.should_skip(-1, &r));
        tracker.record_round(RoundResult::Loss);
        assert!(tracker.should_skip(-1, &r));
    }

    #[test]
    fn duplicate_tc_floor_is_rejected() {
        let r = ramp(vec![(0, 1.0), (0, 2.0)], None, WongOutPolicy::Anytime);
        assert_eq!(r.normalized(), Err(0));
    }
}
