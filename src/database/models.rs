//! Database records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A follower subscribed to one validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub address: String,
    pub subscriber_id: String,
    pub created_at: DateTime<Utc>,
}

/// A fired alert as stored in history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertHistoryRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub alert_type: String,
    pub address: String,
    pub era: u32,
    pub message: String,
    pub severity: String,
    pub delivered: bool,
}
