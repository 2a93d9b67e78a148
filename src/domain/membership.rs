use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Price-list entry for a membership level. Prices are minor currency units;
/// the active window bounds when the level can be claimed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub active_from: DateTime<Utc>,
    pub active_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn active_at(&self, at: DateTime<Utc>) -> bool {
        self.active_from <= at && self.active_to.map(|to| at < to).unwrap_or(true)
    }

    pub fn free(&self) -> bool {
        self.price_cents == 0
    }
}
