//! Drift computation between baseline and current metrics.

use std::collections::BTreeMap;

/// Result of comparing current metrics with a baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftReading {
    /// Mean absolute percentage deviation across comparable metrics.
    pub drift_percentage: f64,
    /// Metrics present in both maps with a nonzero, finite baseline.
    pub comparable_metrics: u32,
}

impl DriftReading {
    /// No metric could be compared, so the zero drift carries no signal.
    #[must_use]
    pub const fn is_low_confidence(&self) -> bool {
        self.comparable_metrics == 0
    }

    /// Whether the drift exceeds `threshold_percent`.
    #[must_use]
    pub fn exceeds(&self, threshold_percent: f64) -> bool {
        self.drift_percentage > threshold_percent
    }
}

/// Average `|current - baseline| / |baseline| * 100` over shared metric names.
///
/// Zero baselines and non-finite values are skipped. With nothing to compare
/// the drift is `0.0` and the reading is low-confidence.
#[must_use]
pub fn compute_drift(
    baseline: &BTreeMap<String, f64>,
    current: &BTreeMap<String, f64>,
) -> DriftReading {
    let deviations: Vec<f64> = baseline
        .iter()
        .filter_map(|(name, &base)| {
            let cur = *current.get(name)?;
            if base == 0.0 || !base.is_finite() || !cur.is_finite() {
                return None;
            }
            Some((cur - base).abs() / base.abs() * 100.0)
        })
        .collect();

    if deviations.is_empty() {
        return DriftReading {
            drift_percentage: 0.0,
            comparable_metrics: 0,
        };
    }

    let count = deviations.len();
    DriftReading {
        drift_percentage: deviations.iter().sum::<f64>() / count as f64,
        comparable_metrics: u32::try_from(count).unwrap_or(u32::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn averages_shared_metrics() {
        let baseline = metrics(&[("accuracy", 0.90), ("latency_ms", 100.0)]);
        let current = metrics(&[("accuracy", 0.81), ("latency_ms", 110.0)]);
        let reading = compute_drift(&baseline, &current);
        assert_eq!(reading.comparable_metrics, 2);
        assert!((reading.drift_percentage - 10.0).abs() < 1e-9);
        assert!(!reading.is_low_confidence());
    }

    #[test]
    fn ignores_metrics_missing_from_either_side() {
        let baseline = metrics(&[("accuracy", 0.5), ("recall", 0.7)]);
        let current = metrics(&[("accuracy", 0.6), ("precision", 0.9)]);
        let reading = compute_drift(&baseline, &current);
        assert_eq!(reading.comparable_metrics, 1);
        assert!((reading.drift_percentage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_baseline_is_excluded() {
        let baseline = metrics(&[("errors", 0.0), ("accuracy", 1.0)]);
        let current = metrics(&[("errors", 5.0), ("accuracy", 0.95)]);
        let reading = compute_drift(&baseline, &current);
        assert_eq!(reading.comparable_metrics, 1);
        assert!((reading.drift_percentage - 5.0).abs() < 1e-9);
    }

    #[test]
    fn negative_baseline_uses_magnitude() {
        let baseline = metrics(&[("bias", -2.0)]);
        let current = metrics(&[("bias", -1.0)]);
        let reading = compute_drift(&baseline, &current);
        assert!((reading.drift_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn nothing_comparable_is_low_confidence_zero() {
        let baseline = metrics(&[("errors", 0.0)]);
        let current = metrics(&[("accuracy", 0.9)]);
        let reading = compute_drift(&baseline, &current);
        assert_eq!(reading.drift_percentage, 0.0);
        assert!(reading.is_low_confidence());
        assert!(!reading.exceeds(0.0));
    }
}
