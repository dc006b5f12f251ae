//! Pure domain logic: market pools, oracle readings, and settlement math.

mod balance;
mod drift;
mod id;
mod market;
mod model;
mod money;
mod odds;
mod payout;
mod position;
mod receipt;

// Identifiers and money
pub use id::{EntryId, MarketId, ModelId, PositionId, ReceiptId, UserId};
pub use money::{format_usdc, parse_usdc, Amount, OddsValue, MICROS_PER_USDC};

// Models and oracle readings
pub use drift::{compute_drift, DriftReading};
pub use model::{EndpointAuth, HealthStatus, Model, NewModel};
pub use receipt::{sha256_hex, MetricsSnapshot, MonitoringReceipt, ReceiptEvidence};

// Markets and positions
pub use market::{Market, MarketStatus, NewMarket, Outcome, SettlementSummary, Side};
pub use position::{BetRecord, Position};

// Pricing and settlement
pub use odds::{BetApplication, Odds, PoolPricing};
pub use payout::{plan_payouts, Allocation, PayoutPlan};

// Balances
pub use balance::{Transaction, TransactionKind, UserBalance};
pub(crate) use balance::signed;
