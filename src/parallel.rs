use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::warn;
use rayon::prelude::*;

use crate::aggregator::TcBucketStats;
use crate::engine::{self, CancelCheck, ProgressCallback};
use crate::request::SimulationRequest;
use crate::result::{build_result, SimulationResult};
use crate::worker::{RoundOutcome, Worker};

const TARGET_CHUNK_SIZE: u64 = 50_000;
const MIN_CHUNKS: u64 = 32;
const MAX_CHUNKS: u64 = 256;
const CHUNK_SEED_STRIDE: u64 = 1_000_000_007;
const FALLBACK_HANDS_THRESHOLD: u64 = 100_000;

/// One chunk's raw totals, handed back from a worker thread for merging
/// (spec.md §4.6 "SimulationChunk").
struct ChunkSummary {
    hands: u64,
    sum_profit: f64,
    sum_sq_profit: f64,
    sum_initial_bet: f64,
    tc_histogram: HashMap<i32, u64>,
    tc_histogram_est: HashMap<i32, u64>,
    tc_stats: HashMap<i32, TcBucketStats>,
    was_cancelled: bool,
}

/// Plays one chunk's worth of rounds, checking `cancel_check` at the same
/// cadence as [`engine::run`] so a chunk already in flight stops short
/// instead of running to completion after cancellation (spec.md §5, §9).
fn run_chunk(
    request: &SimulationRequest,
    chunk_hands: u64,
    chunk_seed: u64,
    cancel_check: Option<&CancelCheck>,
) -> ChunkSummary {
    let cancel_check_interval = (chunk_hands / 100).max(1_000);
    let mut worker = Worker::new(chunk_seed, request);
    let mut was_cancelled = false;
    while worker.aggregator.rounds_played() < chunk_hands {
        if let Some(check) = cancel_check {
            if worker.aggregator.rounds_played() % cancel_check_interval == 0 && check() {
                was_cancelled = true;
                break;
            }
        }
        worker.run_round();
    }
    ChunkSummary {
        hands: worker.aggregator.rounds_played(),
        sum_profit: worker.aggregator.sum_profit(),
        sum_sq_profit: worker.aggregator.sum_sq_profit(),
        sum_initial_bet: worker.aggregator.sum_initial_bet(),
        tc_histogram: worker.aggregator.tc_histogram().clone(),
        tc_histogram_est: worker.aggregator.tc_histogram_est().clone(),
        tc_stats: worker.aggregator.tc_stats().clone(),
        was_cancelled,
    }
}

/// Merges a bucket's moments the way the original engine's `aggregate_chunks`
/// does: reconstitute `sum(x)` and `sum(x^2)` from each chunk's Welford
/// moments, then recompute the combined mean/variance once (spec.md §4.6).
fn merge_bucket(stats: impl Iterator<Item = TcBucketStats>) -> TcBucketStats {
    let mut n_total = 0u64;
    let mut n_iba = 0u64;
    let mut n_zero = 0u64;
    let mut sum_x = 0.0;
    let mut sum_x2 = 0.0;
    for s in stats {
        n_total += s.n_total;
        n_iba += s.n_iba;
        n_zero += s.n_zero;
        if s.n_iba > 0 {
            sum_x += s.mean * s.n_iba as f64;
            sum_x2 += s.m2 + s.n_iba as f64 * s.mean * s.mean;
        }
    }
    let (mean, m2) = if n_iba > 0 {
        let mean = sum_x / n_iba as f64;
        let m2 = (sum_x2 - n_iba as f64 * mean * mean).max(0.0);
        (mean, m2)
    } else {
        (0.0, 0.0)
    };
    TcBucketStats {
        n_total,
        n_iba,
        n_zero,
        mean,
        m2,
    }
}

fn aggregate(chunks: Vec<ChunkSummary>, request: &SimulationRequest, was_cancelled: bool) -> SimulationResult {
    let total_hands: u64 = chunks.iter().map(|c| c.hands).sum();
    let total_profit: f64 = chunks.iter().map(|c| c.sum_profit).sum();
    let total_sq_profit: f64 = chunks.iter().map(|c| c.sum_sq_profit).sum();
    let total_bet: f64 = chunks.iter().map(|c| c.sum_initial_bet).sum();

    let mut tc_histogram: HashMap<i32, u64> = HashMap::new();
    let mut tc_histogram_est: HashMap<i32, u64> = HashMap::new();
    let mut buckets: HashMap<i32, Vec<TcBucketStats>> = HashMap::new();
    for chunk in &chunks {
        for (&tc, &count) in &chunk.tc_histogram {
            *tc_histogram.entry(tc).or_insert(0) += count;
        }
        for (&tc, &count) in &chunk.tc_histogram_est {
            *tc_histogram_est.entry(tc).or_insert(0) += count;
        }
        for (&tc, &stat) in &chunk.tc_stats {
            buckets.entry(tc).or_default().push(stat);
        }
    }
    let tc_stats: HashMap<i32, TcBucketStats> = buckets
        .into_iter()
        .map(|(tc, stats)| (tc, merge_bucket(stats.into_iter())))
        .collect();

    let mut meta = HashMap::new();
    meta.insert(
        "note".to_string(),
        if was_cancelled {
            "cancelled".to_string()
        } else {
            format!("parallel sim ({} workers)", chunks.len())
        },
    );
    meta.insert("workers".to_string(), chunks.len().to_string());
    meta.insert("was_cancelled".to_string(), was_cancelled.to_string());

    build_result(
        total_hands,
        total_profit,
        total_sq_profit,
        total_bet,
        tc_histogram,
        tc_histogram_est,
        tc_stats,
        request,
        meta,
        None,
    )
}

/// Fans a simulation out across `num_workers` rayon threads, each with its
/// own seeded [`Worker`] (spec.md §5). Falls back to the single-threaded
/// [`engine::run`] for small runs, a single worker, or if every chunk panics
/// — mirroring `run_simulation_parallel`'s fallbacks exactly. `cancel_check`
/// is shared across chunk threads and polled inside each chunk's round loop;
/// once any chunk reports cancellation, chunks not yet started are skipped
/// and whatever completed is aggregated (spec.md §5, §9). `progress_cb` is
/// invoked once per completed chunk with the running totals across every
/// chunk that has finished so far — the closest rayon equivalent of the
/// original's `as_completed`-driven per-chunk progress reporting.
pub fn run(
    request: &SimulationRequest,
    num_workers: usize,
    mut progress_cb: Option<&mut ProgressCallback>,
    cancel_check: Option<&CancelCheck>,
) -> SimulationResult {
    if request.hands < FALLBACK_HANDS_THRESHOLD || num_workers <= 1 {
        return engine::run(request, progress_cb, cancel_check);
    }

    let num_chunks = (request.hands / TARGET_CHUNK_SIZE).clamp(MIN_CHUNKS, MAX_CHUNKS);
    let base_chunk_size = request.hands / num_chunks;
    let remainder = request.hands % num_chunks;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .build();
    let Ok(pool) = pool else {
        warn!("failed to build a rayon thread pool, falling back to single-threaded");
        return engine::run(request, progress_cb, cancel_check);
    };

    let cancelled_flag = AtomicBool::new(false);
    let progress_totals = Mutex::new((0u64, 0.0f64, 0.0f64, 0.0f64));
    let progress_mutex: Mutex<Option<&mut ProgressCallback>> = Mutex::new(progress_cb.take());

    let chunks: Vec<ChunkSummary> = pool.install(|| {
        (0..num_chunks)
            .into_par_iter()
            .filter_map(|i| {
                if cancelled_flag.load(Ordering::Relaxed) {
                    return None;
                }
                let chunk_hands = base_chunk_size + if i < remainder { 1 } else { 0 };
                let chunk_seed = request.seed + i * CHUNK_SEED_STRIDE;
                let result = catch_unwind(AssertUnwindSafe(|| {
                    run_chunk(request, chunk_hands, chunk_seed, cancel_check)
                }))
                .map_err(|_| warn!("chunk {i} panicked, dropping it from the aggregate"))
                .ok();

                if let Some(chunk) = &result {
                    if chunk.was_cancelled {
                        cancelled_flag.store(true, Ordering::Relaxed);
                    }
                    let mut totals = progress_totals.lock().unwrap();
                    totals.0 += chunk.hands;
                    totals.1 += chunk.sum_profit;
                    totals.2 += chunk.sum_sq_profit;
                    totals.3 += chunk.sum_initial_bet;
                    let (hands, profit, sq_profit, bet) = *totals;
                    drop(totals);
                    if let Ok(mut guard) = progress_mutex.lock() {
                        if let Some(cb) = guard.as_mut() {
                            cb(hands, request.hands, profit, sq_profit, bet);
                        }
                    }
                }
                result
            })
            .collect()
    });

    let was_cancelled = cancelled_flag.load(Ordering::Relaxed);
    let progress_cb = progress_mutex.into_inner().unwrap();

    if chunks.is_empty() {
        warn!("every chunk failed, falling back to single-threaded");
        return engine::run(request, progress_cb, cancel_check);
    }

    aggregate(chunks, request, was_cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_runs_fall_back_to_single_threaded() {
        let request = SimulationRequest {
            hands: 500,
            ..SimulationRequest::default()
        };
        let result = run(&request, 4, None, None);
        assert_eq!(result.rounds_played, 500);
        assert_eq!(result.meta.get("note").map(String::as_str), Some("single-process sim"));
    }

    #[test]
    fn large_runs_fan_out_and_merge_all_hands() {
        let request = SimulationRequest {
            hands: 150_000,
            ..SimulationRequest::default()
        };
        let result = run(&request, 4, None, None);
        assert_eq!(result.rounds_played, 150_000);
        assert!(result.meta.get("note").unwrap().starts_with("parallel sim"));
        assert_eq!(result.meta.get("was_cancelled").map(String::as_str), Some("false"));
    }

    #[test]
    fn cancellation_stops_the_fan_out_early() {
        let request = SimulationRequest {
            hands: 150_000,
            ..SimulationRequest::default()
        };
        let cancel = || true;
        let result = run(&request, 4, None, Some(&cancel));
        assert!(result.rounds_played < 150_000);
        assert_eq!(result.meta.get("was_cancelled").map(String::as_str), Some("true"));
    }

    #[test]
    fn progress_callback_fires_per_completed_chunk() {
        let request = SimulationRequest {
            hands: 150_000,
            ..SimulationRequest::default()
        };
        let mut calls = 0;
        let mut cb = |_played: u64, _target: u64, _p: f64, _sp: f64, _b: f64| {
            calls += 1;
        };
        let result = run(&request, 4, Some(&mut cb), None);
        assert_eq!(result.rounds_played, 150_000);
        assert!(calls >= 1);
    }

    #[test]
    fn merge_bucket_matches_direct_pooled_computation() {
        let a = TcBucketStats {
            n_total: 3,
            n_iba: 3,
            n_zero: 0,
            mean: 1.0,
            m2: 2.0,
        };
        let b = TcBucketStats {
            n_total: 2,
            n_iba: 2,
            n_zero: 0,
            mean: -1.0,
            m2: 0.5,
        };
        let merged = merge_bucket([a, b].into_iter());
        assert_eq!(merged.n_iba, 5);
        let direct_mean = (1.0 * 3.0 + -1.0 * 2.0) / 5.0;
        assert!((merged.mean - direct_mean).abs() < 1e-9);
    }
}
