use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    /// Present only if this user is linked to a student record
    pub student_id: Option<String>,
}
