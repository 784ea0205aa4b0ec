use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rentable unit owned by a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePropertyInput {
    pub name: String,
    pub address: Option<String>,
}
