use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentData {
    pub id: Uuid,
    pub name: String,
    pub roll_number: String,
    pub email: String,
    pub password_hash: String,
    pub photo_url: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Outward-facing view of a student, without the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub name: String,
    pub roll_number: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StudentData> for StudentProfile {
    fn from(data: StudentData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            roll_number: data.roll_number,
            email: data.email,
            photo_url: data.photo_url,
            role: data.role,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub roll_number: String,
    pub student_name: String,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub marked_at: DateTime<Utc>,
}
