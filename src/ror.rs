use serde::{Deserialize, Serialize};

/// Risk-of-ruin detail, mirroring the original engine's `RoRResult`
/// (spec.md §4.7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoRResult {
    pub simple_ror: f64,
    pub adjusted_ror: f64,
    pub trip_ror: Option<f64>,
    pub trip_hours: Option<f64>,
    pub required_bankroll_5pct: Option<f64>,
    pub required_bankroll_1pct: Option<f64>,
    pub n0_hands: f64,
}

/// Abramowitz & Stegun 7.1.26 approximation of the error function; no crate
/// in the pack provides one, so this stays a plain numerical routine rather
/// than a stdlib stand-in for something the ecosystem supplies.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let y = 1.0 - poly * (-x * x).exp();
    sign * y
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Simple session risk of ruin: 1.0 if the edge isn't positive, else
/// `exp(-k * bankroll)` with `k = 2*mean/variance` (spec.md §4.7).
pub fn simple_ror(mean: f64, variance: f64, bankroll: f64) -> f64 {
    if mean <= 0.0 {
        return 1.0;
    }
    let k = if variance > 0.0 {
        2.0 * mean / variance
    } else {
        0.0
    };
    (-k * bankroll).exp()
}

/// Full risk-of-ruin detail: simple RoR, trip RoR over `trip_hours` at
/// `hands_per_hour`, and required bankrolls for 5%/1% target RoR.
pub fn calculate_ror_detail(
    mean: f64,
    variance: f64,
    bankroll: f64,
    n0_hands: f64,
    trip_hours: Option<f64>,
    hands_per_hour: f64,
) -> RoRResult {
    let (simple, adjusted) = if mean <= 0.0 {
        (1.0, 1.0)
    } else {
        let ror = simple_ror(mean, variance, bankroll);
        (ror, ror)
    };

    let trip_ror = trip_hours.filter(|h| *h > 0.0).and_then(|hours| {
        let trip_hands = hours * hands_per_hour;
        let trip_mean = mean * trip_hands;
        let trip_stdev = (variance * trip_hands).sqrt();
        if trip_stdev <= 0.0 {
            return None;
        }
        let z = (-bankroll - trip_mean) / trip_stdev;
        Some(if z < -3.0 {
            0.0
        } else if z > 3.0 {
            1.0
        } else {
            normal_cdf(z)
        })
    });

    let (required_5pct, required_1pct) = if mean > 0.0 && variance > 0.0 {
        let k = 2.0 * mean / variance;
        (Some(-0.05_f64.ln() / k), Some(-0.01_f64.ln() / k))
    } else {
        (None, None)
    };

    RoRResult {
        simple_ror: simple,
        adjusted_ror: adjusted,
        trip_ror,
        trip_hours,
        required_bankroll_5pct: required_5pct,
        required_bankroll_1pct: required_1pct,
        n0_hands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_edge_is_certain_ruin() {
        assert_eq!(simple_ror(0.0, 1.0, 1000.0), 1.0);
        assert_eq!(simple_ror(-0.1, 1.0, 1000.0), 1.0);
    }

    #[test]
    fn larger_bankroll_lowers_ror() {
        let small = simple_ror(0.01, 1.0, 100.0);
        let large = simple_ror(0.01, 1.0, 1000.0);
        assert!(large < small);
    }

    #[test]
    fn trip_ror_extremes_are_clamped() {
        let detail = calculate_ror_detail(1.0, 1.0, 100_000.0, 1.0, Some(4.0), 100.0);
        assert_eq!(detail.trip_ror, Some(0.0));

        let detail = calculate_ror_detail(-1.0, 1.0, 0.01, 1.0, Some(4.0), 100.0);
        assert_eq!(detail.trip_ror, Some(1.0));
    }

    #[test]
    fn trip_ror_is_omitted_when_variance_is_zero() {
        let detail = calculate_ror_detail(1.0, 0.0, 100_000.0, 1.0, Some(4.0), 100.0);
        assert_eq!(detail.trip_ror, None);
    }

    #[test]
    fn required_bankroll_increases_as_target_ror_tightens() {
        let detail = calculate_ror_detail(0.01, 1.0, 100.0, 1.0, None, 100.0);
        let b5 = detail.required_bankroll_5pct.unwrap();
        let b1 = detail.required_bankroll_1pct.unwrap();
        assert!(b1 > b5);
    }
}
