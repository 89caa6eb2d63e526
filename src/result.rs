use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregator::TcBucketStats;
use crate::request::SimulationRequest;
use crate::ror::{calculate_ror_detail, simple_ror, RoRResult};

/// EV-by-true-count row (spec.md §4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TcTableEntry {
    pub tc: i32,
    pub n: u64,
    pub n_iba: u64,
    pub n_zero: u64,
    pub freq: f64,
    pub ev_pct: f64,
    pub ev_se_pct: f64,
    pub variance: f64,
}

/// Full simulation output (spec.md §3 "SimulationResult", §6 response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub ev_per_100: f64,
    pub stdev_per_100: f64,
    pub variance_per_hand: f64,
    pub di: f64,
    pub score: f64,
    pub n0_hands: f64,
    pub ror: Option<f64>,
    pub ror_detail: Option<RoRResult>,
    pub avg_initial_bet: Option<f64>,
    pub avg_initial_bet_units: Option<f64>,
    pub tc_histogram: HashMap<i32, u64>,
    pub tc_histogram_est: HashMap<i32, u64>,
    pub tc_table: Vec<TcTableEntry>,
    pub meta: HashMap<String, String>,
    pub hours_played: Option<f64>,
    pub rounds_played: u64,
    pub debug_hands: Option<Vec<HashMap<String, String>>>,
}

impl SimulationResult {
    pub fn no_hands_played(mut meta: HashMap<String, String>) -> Self {
        meta.entry("note".to_string())
            .or_insert_with(|| "no hands played".to_string());
        SimulationResult {
            ev_per_100: 0.0,
            stdev_per_100: 0.0,
            variance_per_hand: 0.0,
            di: 0.0,
            score: 0.0,
            n0_hands: 0.0,
            ror: None,
            ror_detail: None,
            avg_initial_bet: None,
            avg_initial_bet_units: None,
            tc_histogram: HashMap::new(),
            tc_histogram_est: HashMap::new(),
            tc_table: Vec::new(),
            meta,
            hours_played: None,
            rounds_played: 0,
            debug_hands: None,
        }
    }
}

/// Builds the final [`SimulationResult`] from accumulated moments
/// (spec.md §4.5). Shared by the single-worker engine and the parallel
/// driver's merge step, since both reduce to the same aggregate shape.
#[allow(clippy::too_many_arguments)]
pub fn build_result(
    rounds_played: u64,
    sum_profit: f64,
    sum_sq_profit: f64,
    sum_initial_bet: f64,
    tc_histogram: HashMap<i32, u64>,
    tc_histogram_est: HashMap<i32, u64>,
    tc_stats: HashMap<i32, TcBucketStats>,
    request: &SimulationRequest,
    mut meta: HashMap<String, String>,
    debug_hands: Option<Vec<HashMap<String, String>>>,
) -> SimulationResult {
    if rounds_played == 0 {
        return SimulationResult::no_hands_played(meta);
    }

    let mean = sum_profit / rounds_played as f64;
    let variance = (sum_sq_profit / rounds_played as f64 - mean * mean).max(0.0);
    let stdev = variance.sqrt();

    let ev_per_100 = mean * 100.0;
    let stdev_per_100 = stdev * 10.0;
    let di = if stdev > 0.0 { mean / stdev } else { 0.0 };
    let score = if variance > 0.0 {
        100.0 * (mean * mean) / variance
    } else {
        0.0
    };
    let n0_hands = if mean != 0.0 { variance / (mean * mean) } else { 0.0 };

    let (ror, ror_detail) = match request.bankroll {
        Some(bankroll) => {
            let ror = simple_ror(mean, variance, bankroll);
            let detail = calculate_ror_detail(
                mean,
                variance,
                bankroll,
                n0_hands,
                Some(4.0),
                request.hands_per_hour,
            );
            (Some(ror), Some(detail))
        }
        None => (None, None),
    };

    let total_obs: u64 = tc_stats.values().map(|s| s.n_total).sum();
    let mut tc_table: Vec<TcTableEntry> = tc_stats
        .iter()
        .filter(|(_, stat)| stat.n_total > 0)
        .map(|(&tc, stat)| {
            let freq = if total_obs > 0 {
                stat.n_total as f64 / total_obs as f64
            } else {
                0.0
            };
            let (ev_pct, ev_se_pct, var_x) = if stat.n_iba > 0 {
                let var_x = stat.variance();
                let se_x = (var_x / stat.n_iba as f64).sqrt();
                (stat.mean * 100.0, se_x * 100.0, var_x)
            } else {
                (0.0, 0.0, 0.0)
            };
            TcTableEntry {
                tc,
                n: stat.n_total,
                n_iba: stat.n_iba,
                n_zero: stat.n_zero,
                freq,
                ev_pct,
                ev_se_pct,
                variance: var_x,
            }
        })
        .collect();
    tc_table.sort_by_key(|e| e.tc);

    let hours_played = if request.hands_per_hour > 0.0 {
        Some(rounds_played as f64 / request.hands_per_hour)
    } else {
        None
    };
    let avg_initial_bet = sum_initial_bet / rounds_played as f64;
    let avg_initial_bet_units = avg_initial_bet / request.unit_size;

    meta.insert("rounds_played".to_string(), rounds_played.to_string());

    SimulationResult {
        ev_per_100,
        stdev_per_100,
        variance_per_hand: variance,
        di,
        score,
        n0_hands,
        ror,
        ror_detail,
        avg_initial_bet: Some(avg_initial_bet),
        avg_initial_bet_units: Some(avg_initial_bet_units),
        tc_histogram,
        tc_histogram_est,
        tc_table,
        meta,
        hours_played,
        rounds_played,
        debug_hands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rounds_returns_well_formed_zero_result() {
        let result = build_result(
            0,
            0.0,
            0.0,
            0.0,
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            &SimulationRequest::default(),
            HashMap::new(),
            None,
        );
        assert_eq!(result.rounds_played, 0);
        assert_eq!(result.ev_per_100, 0.0);
        assert_eq!(result.meta.get("note").unwrap(), "no hands played");
    }

    #[test]
    fn positive_mean_produces_finite_metrics() {
        let mut stats = HashMap::new();
        stats.insert(
            0,
            TcBucketStats {
                n_total: 10,
                n_iba: 10,
                n_zero: 0,
                mean: 0.05,
                m2: 0.9,
            },
        );
        let result = build_result(
            10,
            5.0,
            50.0,
            100.0,
            HashMap::new(),
            HashMap::new(),
            stats,
            &SimulationRequest::default(),
            HashMap::new(),
            None,
        );
        assert!(result.ev_per_100 > 0.0);
        assert_eq!(result.avg_initial_bet, Some(10.0));
        assert_eq!(result.tc_table.len(), 1);
    }
}
