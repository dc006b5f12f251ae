//! Notifier port for engine events.
//!
//! Events are dispatched after the ledger commit that produced them, so a
//! notifier can never roll back or block a financial state transition.

use serde::Serialize;

use crate::domain::{
    format_usdc, Amount, HealthStatus, MarketId, ModelId, Outcome, UserId,
};

/// Events that can trigger notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A monitoring cycle measured drift above the model's threshold.
    DriftDetected(DriftEvent),
    /// A market transitioned to resolved and was settled.
    MarketResolved(ResolutionEvent),
    /// A position received a nonzero payout.
    WinningsAvailable(WinningsEvent),
    /// Automated processing gave up on a model or market.
    AttentionRequired(AttentionEvent),
}

impl Event {
    /// User the event is addressed to, if any.
    #[must_use]
    pub fn recipient(&self) -> Option<&UserId> {
        match self {
            Self::DriftDetected(e) => Some(&e.owner_id),
            Self::WinningsAvailable(e) => Some(&e.user_id),
            Self::MarketResolved(_) | Self::AttentionRequired(_) => None,
        }
    }
}

/// Drift detection event.
#[derive(Debug, Clone, Serialize)]
pub struct DriftEvent {
    pub owner_id: UserId,
    pub model_id: ModelId,
    pub model_name: String,
    pub drift_percentage: f64,
    pub threshold_percent: f64,
    pub severity: HealthStatus,
}

/// Market resolution event.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionEvent {
    pub market_id: MarketId,
    pub model_id: ModelId,
    pub outcome: Outcome,
    pub final_drift_percentage: Option<f64>,
    pub total_pool: Amount,
    pub platform_fee: Amount,
    pub winners: u32,
}

/// Payout credited to a user.
#[derive(Debug, Clone, Serialize)]
pub struct WinningsEvent {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub payout: Amount,
}

/// What an attention flag was raised on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AttentionSubject {
    Model(ModelId),
    Market(MarketId),
}

impl std::fmt::Display for AttentionSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(id) => write!(f, "model {id}"),
            Self::Market(id) => write!(f, "market {id}"),
        }
    }
}

/// Attention flag event.
#[derive(Debug, Clone, Serialize)]
pub struct AttentionEvent {
    pub subject: AttentionSubject,
    pub reason: String,
}

/// Trait for notification handlers.
///
/// Notifications are fire-and-forget. Implementations must return quickly
/// and spawn a task for anything involving I/O.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{info, warn};
        match event {
            Event::DriftDetected(e) => {
                warn!(
                    model_id = %e.model_id,
                    owner = %e.owner_id,
                    drift = e.drift_percentage,
                    threshold = e.threshold_percent,
                    severity = %e.severity,
                    "Drift detected"
                );
            }
            Event::MarketResolved(e) => {
                info!(
                    market_id = %e.market_id,
                    outcome = %e.outcome,
                    pool = %format_usdc(e.total_pool),
                    fee = %format_usdc(e.platform_fee),
                    winners = e.winners,
                    "Market resolved"
                );
            }
            Event::WinningsAvailable(e) => {
                info!(
                    user = %e.user_id,
                    market_id = %e.market_id,
                    payout = %format_usdc(e.payout),
                    "Winnings available"
                );
            }
            Event::AttentionRequired(e) => {
                warn!(subject = %e.subject, reason = %e.reason, "Attention required");
            }
        }
    }
}
