use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::err::Error;
use crate::models::{StudentData, StudentProfile};
use crate::qr::{self, QrPayload};
use crate::token::Identity;
use crate::{breaks, proceeds, Payload};

pub async fn profile(
    identity: Identity,
    Extension(pg): Extension<PgPool>,
) -> Payload<ProfileResponse> {
    let user_id = identity.student_id()?;

    let student = sqlx::query_as::<_, StudentData>("SELECT * FROM students WHERE id = $1 LIMIT 1")
        .bind(user_id)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;

    match student {
        Some(student) => proceeds(ProfileResponse {
            student: student.into(),
        }),
        None => breaks(Error::not_found("Student not found")),
    }
}

pub async fn update_profile(
    identity: Identity,
    Extension(pg): Extension<PgPool>,
    Json(update): Json<UpdateProfile>,
) -> Payload<ProfileUpdated> {
    let user_id = identity.student_id()?;

    let res = sqlx::query(
        "UPDATE students
         SET name = COALESCE($2, name), email = COALESCE($3, email), updated_at = $4
         WHERE id = $1",
    )
    .bind(user_id)
    .bind(update.name)
    .bind(update.email)
    .bind(Utc::now())
    .execute(&pg)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            Error::conflict("Student with this email already exists")
        } else {
            Error::from(err)
        }
    })?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found("Student not found"));
    }

    proceeds(ProfileUpdated {
        message: "Profile updated successfully",
    })
}

pub async fn qr_code(identity: Identity) -> Payload<QrCodeResponse> {
    let student_id = identity.student_id()?;
    let roll_number = match identity.0.roll_number.clone() {
        Some(roll) => roll,
        None => return breaks(Error::bad_request("Roll number not found in token")),
    };

    let payload = QrPayload {
        student_id,
        roll_number: roll_number.clone(),
        timestamp: Utc::now().timestamp_millis(),
    };
    let qr_code = qr::render_data_url(&payload)?;

    proceeds(QrCodeResponse {
        qr_code,
        student_id,
        roll_number,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    student: StudentProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdated {
    message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeResponse {
    qr_code: String,
    student_id: Uuid,
    roll_number: String,
}
