use axum::body::{boxed, Full};
use axum::extract::Query;
use axum::http::header;
use axum::response::Response;
use axum::Extension;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::attendance::{fetch_filtered, AttendanceFeed, FEED_CAP};
use crate::err::Error;
use crate::models::{StudentData, StudentProfile};
use crate::report::{self, Stats};
use crate::token::AdminIdentity;
use crate::{proceeds, Payload};

pub async fn students(
    _admin: AdminIdentity,
    Extension(pg): Extension<PgPool>,
) -> Payload<StudentRoster> {
    let students = sqlx::query_as::<_, StudentData>("SELECT * FROM students ORDER BY created_at")
        .fetch_all(&pg)
        .await
        .map_err(Error::from)?;

    let students: Vec<StudentProfile> = students.into_iter().map(StudentProfile::from).collect();
    let total = students.len();
    proceeds(StudentRoster { students, total })
}

pub async fn stats(
    _admin: AdminIdentity,
    Query(range): Query<DateRange>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Stats> {
    let records = fetch_filtered(&pg, None, range.bounds(), None, None).await?;
    proceeds(report::compute_stats(&records))
}

pub async fn export_csv(
    _admin: AdminIdentity,
    Query(range): Query<DateRange>,
    Extension(pg): Extension<PgPool>,
) -> Result<Response, Error> {
    let records = fetch_filtered(&pg, None, range.bounds(), None, None).await?;
    let csv = report::render_csv(&records);

    Response::builder()
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"attendance.csv\"",
        )
        .body(boxed(Full::from(csv)))
        .map_err(|err| Error::InternalError {
            kind: "ResponseError",
            message: err.to_string(),
        })
}

pub async fn attendance(
    _admin: AdminIdentity,
    Query(filter): Query<AdminAttendanceFilter>,
    Extension(pg): Extension<PgPool>,
) -> Payload<AttendanceFeed> {
    // An exact date wins over a range, as in the dashboard's own queries.
    let (date, range) = match filter.date {
        Some(date) => (Some(date), None),
        None => (None, filter.bounds()),
    };
    let attendance = fetch_filtered(&pg, date, range, filter.student_id, Some(FEED_CAP)).await?;
    proceeds(AttendanceFeed::from(attendance))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    // The range only applies when both ends are present.
    fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAttendanceFilter {
    pub date: Option<NaiveDate>,
    pub student_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AdminAttendanceFilter {
    fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentRoster {
    students: Vec<StudentProfile>,
    total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_needs_both_ends() {
        let full = DateRange {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            end_date: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        };
        assert!(full.bounds().is_some());

        let half = DateRange {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            end_date: None,
        };
        assert!(half.bounds().is_none());
    }
}
