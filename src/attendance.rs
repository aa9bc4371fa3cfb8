use axum::extract::{Path, Query};
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::err::Error;
use crate::models::{AttendanceRecord, StudentData};
use crate::token::Identity;
use crate::{breaks, establishes, proceeds, Payload};

// Admin-facing feeds silently stop at this many rows.
pub const FEED_CAP: i64 = 1000;

pub async fn mark(
    identity: Identity,
    Extension(pg): Extension<PgPool>,
    Json(body): Json<MarkAttendance>,
) -> Payload<MarkedAttendance> {
    let student_id = match body.student_id {
        Some(id) => id,
        None => return breaks(Error::bad_request("Student ID is required")),
    };

    if !identity.may_access(student_id) {
        return breaks(Error::forbidden("You can only mark your own attendance"));
    }

    let student = sqlx::query_as::<_, StudentData>("SELECT * FROM students WHERE id = $1 LIMIT 1")
        .bind(student_id)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;
    let student = match student {
        Some(student) => student,
        None => return breaks(Error::not_found("Student not found")),
    };

    let now = Utc::now();
    let today = now.date_naive();

    if let Some(existing) = find_for_day(&pg, student_id, today).await? {
        return breaks(Error::already_marked(existing));
    }

    // The unique (student_id, date) constraint arbitrates concurrent marks;
    // the pre-check above only short-circuits the common case.
    let inserted = sqlx::query_as::<_, AttendanceRecord>(
        "INSERT INTO attendance(id, student_id, roll_number, student_name, date, timestamp, method, marked_at)
         VALUES($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (student_id, date) DO NOTHING
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(&student.roll_number)
    .bind(&student.name)
    .bind(today)
    .bind(now)
    .bind(body.method.unwrap_or_else(|| "manual".to_string()))
    .bind(now)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match inserted {
        Some(attendance) => {
            log::info!(
                "Marked attendance for {} on {} via {}",
                attendance.student_id,
                attendance.date,
                attendance.method
            );
            establishes(MarkedAttendance {
                message: "Attendance marked successfully",
                attendance,
            })
        }
        None => {
            let existing = find_for_day(&pg, student_id, today)
                .await?
                .ok_or_else(|| Error::InternalError {
                    kind: "DatabaseError",
                    message: "Conflicting attendance record disappeared".to_string(),
                })?;
            breaks(Error::already_marked(existing))
        }
    }
}

pub async fn student_attendance(
    identity: Identity,
    Path(student_id): Path<Uuid>,
    Extension(pg): Extension<PgPool>,
) -> Payload<StudentAttendance> {
    if !identity.may_access(student_id) {
        return breaks(Error::forbidden("Access denied"));
    }

    let attendance = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance WHERE student_id = $1 ORDER BY timestamp DESC",
    )
    .bind(student_id)
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    let total_days = attendance.len();
    proceeds(StudentAttendance {
        student_id,
        attendance,
        total_days,
    })
}

pub async fn all_attendance(
    _identity: Identity,
    Query(filter): Query<AttendanceFilter>,
    Extension(pg): Extension<PgPool>,
) -> Payload<AttendanceFeed> {
    let attendance =
        fetch_filtered(&pg, filter.date, None, filter.student_id, Some(FEED_CAP)).await?;
    proceeds(AttendanceFeed::from(attendance))
}

pub async fn find_for_day(
    pg: &PgPool,
    student_id: Uuid,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance WHERE student_id = $1 AND date = $2 LIMIT 1",
    )
    .bind(student_id)
    .bind(date)
    .fetch_optional(pg)
    .await
    .map_err(Error::from)
}

// Shared filter query for the token-gated feed and the admin views. A NULL
// limit means no cap (stats and CSV export read the whole filtered set).
pub async fn fetch_filtered(
    pg: &PgPool,
    date: Option<NaiveDate>,
    range: Option<(NaiveDate, NaiveDate)>,
    student_id: Option<Uuid>,
    cap: Option<i64>,
) -> Result<Vec<AttendanceRecord>, Error> {
    let (start, end) = match range {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance
         WHERE ($1 IS NULL OR date = $1)
           AND ($2 IS NULL OR date >= $2)
           AND ($3 IS NULL OR date <= $3)
           AND ($4 IS NULL OR student_id = $4)
         ORDER BY timestamp DESC
         LIMIT $5",
    )
    .bind(date)
    .bind(start)
    .bind(end)
    .bind(student_id)
    .bind(cap)
    .fetch_all(pg)
    .await
    .map_err(Error::from)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    pub student_id: Option<Uuid>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkedAttendance {
    message: &'static str,
    attendance: AttendanceRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    student_id: Uuid,
    attendance: Vec<AttendanceRecord>,
    total_days: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFeed {
    attendance: Vec<AttendanceRecord>,
    total_records: usize,
}

impl From<Vec<AttendanceRecord>> for AttendanceFeed {
    fn from(attendance: Vec<AttendanceRecord>) -> Self {
        let total_records = attendance.len();
        Self {
            attendance,
            total_records,
        }
    }
}
