use serde::{Deserialize, Serialize};

/// A student and the course they are assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub student_id: String,
    pub course_id: String,
}
