//! Market resolution.
//!
//! `active -> resolved` happens once per market. The transition is a
//! compare-and-swap on the stored status, taken in the same unit of work that
//! re-checks the preconditions, picks the evidence, and writes the payouts.

use tracing::{debug, info, warn};

use super::engine::Engine;
use super::settlement::{log_settlement, settle_in};
use crate::domain::{Market, MarketId, MarketStatus, MonitoringReceipt, Outcome, PayoutPlan};
use crate::error::{Entity, Error, Result};
use crate::port::{Event, LedgerStore, ResolutionEvent};

/// Result of resolving a market.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub market: Market,
    pub plan: PayoutPlan,
    /// Why the outcome is `invalid`, when it is.
    pub invalid_reason: Option<String>,
}

/// Outcome chosen from the evidence available at the deadline.
struct Verdict {
    outcome: Outcome,
    drift: Option<f64>,
    receipt: Option<MonitoringReceipt>,
    invalid_reason: Option<String>,
}

fn decide(market: &Market, evidence: Option<MonitoringReceipt>) -> Result<Verdict> {
    let Some(receipt) = evidence else {
        return Ok(Verdict {
            outcome: Outcome::Invalid,
            drift: None,
            receipt: None,
            invalid_reason: Some(format!(
                "no monitoring receipt at or before {}",
                market.resolution_deadline
            )),
        });
    };
    receipt.verify()?;

    if receipt.low_confidence {
        return Ok(Verdict {
            outcome: Outcome::Invalid,
            drift: Some(receipt.drift_percentage),
            invalid_reason: Some(format!(
                "receipt {} had no comparable metrics",
                receipt.id
            )),
            receipt: Some(receipt),
        });
    }

    let outcome = if receipt.drift_percentage >= market.drift_threshold_percent {
        Outcome::Drift
    } else {
        Outcome::NoDrift
    };
    Ok(Verdict {
        outcome,
        drift: Some(receipt.drift_percentage),
        receipt: Some(receipt),
        invalid_reason: None,
    })
}

impl<S: LedgerStore> Engine<S> {
    /// Resolve a market from its model's latest receipt and settle it.
    ///
    /// # Errors
    ///
    /// `AlreadyResolved` if another caller won, `ResolutionNotDue` before
    /// the deadline, and `DataIntegrity` if the evidence receipt fails hash
    /// verification. Nothing is written on error.
    pub async fn resolve_market(&self, market_id: &MarketId) -> Result<Resolution> {
        let now = self.now();
        let fee_rate = self.fee_rate();

        let resolution = self.atomically(|tx| {
            let market = tx
                .market(market_id)?
                .ok_or_else(|| Error::not_found(Entity::Market, market_id))?;
            if !market.is_active() {
                return Err(Error::AlreadyResolved {
                    market_id: market_id.to_string(),
                });
            }
            if !market.deadline_passed(now) {
                return Err(Error::ResolutionNotDue {
                    market_id: market_id.to_string(),
                    deadline: market.resolution_deadline,
                });
            }

            let evidence =
                tx.latest_receipt_at_or_before(&market.model_id, market.resolution_deadline)?;
            let verdict = decide(&market, evidence)?;

            let mut resolved = market;
            resolved.status = MarketStatus::Resolved;
            resolved.outcome = Some(verdict.outcome);
            resolved.final_drift_percentage = verdict.drift;
            resolved.resolution_receipt = verdict.receipt.map(|r| r.id);
            resolved.resolved_at = Some(now);
            resolved.attention = None;

            if !tx.resolve_market_if_active(&resolved)? {
                return Err(Error::AlreadyResolved {
                    market_id: market_id.to_string(),
                });
            }
            let (market, plan) = settle_in(tx, resolved, fee_rate, now)?;
            Ok(Resolution {
                market,
                plan,
                invalid_reason: verdict.invalid_reason,
            })
        })?;

        let market = &resolution.market;
        if let Some(reason) = &resolution.invalid_reason {
            warn!(market_id = %market.id, reason = %reason, "Market resolved invalid");
        }
        info!(
            market_id = %market.id,
            outcome = %resolution.plan.outcome,
            drift = ?market.final_drift_percentage,
            threshold = market.drift_threshold_percent,
            "Market resolved"
        );
        log_settlement(market, &resolution.plan);

        self.notify(Event::MarketResolved(ResolutionEvent {
            market_id: market.id.clone(),
            model_id: market.model_id.clone(),
            outcome: resolution.plan.outcome,
            final_drift_percentage: market.final_drift_percentage,
            total_pool: resolution.plan.total_pool,
            platform_fee: resolution.plan.platform_fee,
            winners: market.settlement.as_ref().map_or(0, |s| s.winners),
        }));
        self.notify_winners(market, &resolution.plan);
        Ok(resolution)
    }

    /// Resolve a market if it is due, treating lost races as no-ops.
    ///
    /// Returns `None` when the market is not yet due or was already resolved.
    pub async fn resolve_if_due(&self, market_id: &MarketId) -> Result<Option<Resolution>> {
        match self.resolve_market(market_id).await {
            Ok(resolution) => Ok(Some(resolution)),
            Err(e) if e.is_benign_race() || matches!(e, Error::ResolutionNotDue { .. }) => {
                debug!(market_id = %market_id, reason = %e, "Resolution skipped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{compute_drift, MetricsSnapshot, ModelId, UserId};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn market(threshold: f64) -> Market {
        let now = Utc::now();
        Market {
            id: MarketId::from("m"),
            model_id: ModelId::from("model"),
            creator_id: UserId::new("creator"),
            title: "t".into(),
            drift_threshold_percent: threshold,
            resolution_deadline: now,
            status: MarketStatus::Active,
            total_stake_no_drift: 0,
            total_stake_drift: 0,
            participants: 0,
            outcome: None,
            final_drift_percentage: None,
            resolution_receipt: None,
            resolved_at: None,
            settlement: None,
            attention: None,
            created_at: now,
        }
    }

    fn receipt(baseline: f64, current: f64) -> MonitoringReceipt {
        let baseline = BTreeMap::from([("accuracy".to_string(), baseline)]);
        let snapshot = MetricsSnapshot {
            metrics: BTreeMap::from([("accuracy".to_string(), current)]),
            ..MetricsSnapshot::default()
        };
        let reading = compute_drift(&baseline, &snapshot.metrics);
        MonitoringReceipt::record(ModelId::from("model"), snapshot, reading, 5.0, Utc::now())
            .unwrap()
    }

    #[test]
    fn missing_receipt_is_invalid() {
        let verdict = decide(&market(5.0), None).unwrap();
        assert_eq!(verdict.outcome, Outcome::Invalid);
        assert!(verdict.invalid_reason.is_some());
        assert!(verdict.drift.is_none());
    }

    #[test]
    fn drift_at_threshold_resolves_drift() {
        // 1.0 -> 1.5 is exactly 50%
        let verdict = decide(&market(50.0), Some(receipt(1.0, 1.5))).unwrap();
        assert_eq!(verdict.drift, Some(50.0));
        assert_eq!(verdict.outcome, Outcome::Drift);

        let verdict = decide(&market(5.0), Some(receipt(1.0, 1.2))).unwrap();
        assert_eq!(verdict.outcome, Outcome::Drift);
    }

    #[test]
    fn small_drift_resolves_no_drift() {
        let verdict = decide(&market(5.0), Some(receipt(1.0, 1.01))).unwrap();
        assert_eq!(verdict.outcome, Outcome::NoDrift);
        assert!(verdict.receipt.is_some());
    }

    #[test]
    fn tampered_receipt_is_rejected() {
        let mut r = receipt(1.0, 1.01);
        r.drift_percentage = 50.0;
        assert!(matches!(
            decide(&market(5.0), Some(r)),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[test]
    fn low_confidence_receipt_is_invalid() {
        let r = receipt(0.0, 1.0);
        assert!(r.low_confidence);
        let verdict = decide(&market(5.0), Some(r)).unwrap();
        assert_eq!(verdict.outcome, Outcome::Invalid);
        assert!(verdict.receipt.is_some());
    }
}
