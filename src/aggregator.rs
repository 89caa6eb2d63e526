use std::collections::HashMap;

/// Welford moments over `x = round_profit / initial_bet` for one true-count
/// bucket, plus the raw round counts from spec.md §3 "RoundTcBucket stats".
#[derive(Debug, Clone, Copy, Default)]
pub struct TcBucketStats {
    pub n_total: u64,
    pub n_iba: u64,
    pub n_zero: u64,
    pub mean: f64,
    pub m2: f64,
}

impl TcBucketStats {
    fn welford_update(&mut self, x: f64) {
        self.n_iba += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n_iba as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn variance(&self) -> f64 {
        if self.n_iba == 0 {
            0.0
        } else {
            (self.m2 / self.n_iba as f64).max(0.0)
        }
    }
}

/// Streaming totals and per-true-count-bucket moments for one worker
/// (spec.md §4.5). Owns everything a worker touches; nothing is shared
/// across workers (spec.md §5).
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    sum_profit: f64,
    sum_sq_profit: f64,
    sum_initial_bet: f64,
    rounds_played: u64,
    tc_histogram: HashMap<i32, u64>,
    tc_histogram_est: HashMap<i32, u64>,
    tc_stats: HashMap<i32, TcBucketStats>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one round's true count into both histograms and bumps
    /// `n_total` for the bucket chosen for betting.
    pub fn observe_tc(&mut self, raw_floor: i32, est_floor: i32, bet_bucket: i32) {
        *self.tc_histogram.entry(raw_floor).or_insert(0) += 1;
        *self.tc_histogram_est.entry(est_floor).or_insert(0) += 1;
        self.tc_stats.entry(bet_bucket).or_default().n_total += 1;
    }

    pub fn record_wong_out(&mut self, bucket: i32) {
        self.tc_stats.entry(bucket).or_default().n_zero += 1;
    }

    pub fn record_initial_bet(&mut self, bet: f64) {
        self.sum_initial_bet += bet;
    }

    /// Records a finished round's total profit and updates the bucket's
    /// Welford accumulator when a bet was actually placed.
    pub fn record_round(&mut self, bucket: i32, profit: f64, initial_bet: f64) {
        self.sum_profit += profit;
        self.sum_sq_profit += profit * profit;
        self.rounds_played += 1;
        if initial_bet > 0.0 {
            self.tc_stats
                .entry(bucket)
                .or_default()
                .welford_update(profit / initial_bet);
        }
    }

    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    pub fn sum_profit(&self) -> f64 {
        self.sum_profit
    }

    pub fn sum_sq_profit(&self) -> f64 {
        self.sum_sq_profit
    }

    pub fn sum_initial_bet(&self) -> f64 {
        self.sum_initial_bet
    }

    pub fn tc_histogram(&self) -> &HashMap<i32, u64> {
        &self.tc_histogram
    }

    pub fn tc_histogram_est(&self) -> &HashMap<i32, u64> {
        &self.tc_histogram_est
    }

    pub fn tc_stats(&self) -> &HashMap<i32, TcBucketStats> {
        &self.tc_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welford_matches_direct_computation_on_small_series() {
        let xs = [1.0, -1.0, 1.0, 1.0, -1.0];
        let mut stats = TcBucketStats::default();
        for &x in &xs {
            stats.welford_update(x);
        }
        let n = xs.len() as f64;
        let direct_mean = xs.iter().sum::<f64>() / n;
        let direct_var = xs.iter().map(|x| (x - direct_mean).powi(2)).sum::<f64>() / n;
        assert!((stats.mean - direct_mean).abs() < 1e-9);
        assert!((stats.variance() - direct_var).abs() < 1e-9);
    }

    #[test]
    fn n_total_sums_to_rounds_played_across_buckets() {
        let mut agg = Aggregator::new();
        agg.observe_tc(0, 0, 0);
        agg.record_round(0, 5.0, 10.0);
        agg.observe_tc(1, 1, 1);
        agg.record_wong_out(1);
        agg.observe_tc(2, 2, 2);
        agg.record_round(2, -5.0, 10.0);

        let total_n: u64 = agg.tc_stats().values().map(|s| s.n_total).sum();
        assert_eq!(total_n, 3);
        assert_eq!(agg.rounds_played(), 2);
    }

    #[test]
    fn zero_bet_round_does_not_update_welford() {
        let mut agg = Aggregator::new();
        agg.observe_tc(0, 0, 0);
        agg.record_round(0, 0.0, 0.0);
        assert_eq!(agg.tc_stats()[&0].n_iba, 0);
    }
}
