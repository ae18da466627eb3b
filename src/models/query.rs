//! User queries, unique by text.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserQuery {
    pub id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
    pub fulfilled: Option<DateTime<Utc>>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub cancelled: bool,
}
