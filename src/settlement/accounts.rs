use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::types::ids::UserId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub balance: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Account {
            user_id,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
