use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pre-generated site-selection voting token. Tokens are minted ahead of time
/// for each membership number (`voter_id`) and claimed when the member pays
/// the site-selection fee.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteSelectionToken {
    pub id: Uuid,
    pub election: String,
    pub voter_id: String,
    pub token: String,
    pub claimed_by_reservation_id: Option<Uuid>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SiteSelectionToken {
    pub fn claimed(&self) -> bool {
        self.claimed_by_reservation_id.is_some()
    }
}
