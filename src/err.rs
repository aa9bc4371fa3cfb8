use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

use crate::models::AttendanceRecord;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Invalid path: {}", path),
        }),
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    BadRequest {
        message: String,
    },
    Unauthorized {
        message: String,
    },
    Forbidden {
        message: String,
    },
    NotFound {
        message: String,
    },
    Conflict {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        attendance: Option<AttendanceRecord>,
    },
    InternalError {
        kind: &'static str,
        message: String,
    },
}

impl Error {
    pub fn bad_request<S: Into<String>>(msg: S) -> Error {
        Error::BadRequest {
            message: msg.into(),
        }
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Error {
        Error::Unauthorized {
            message: msg.into(),
        }
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Error {
        Error::Forbidden {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Error {
        Error::Conflict {
            message: msg.into(),
            attendance: None,
        }
    }

    // Duplicate daily mark: the winning record rides along for client display.
    pub fn already_marked(existing: AttendanceRecord) -> Error {
        Error::Conflict {
            message: "Attendance already marked for today".to_string(),
            attendance: Some(existing),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::InternalError {
            kind: "DatabaseError",
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::InternalError {
            kind: "IOError",
            message: io.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError {
            kind: "SerializationError",
            message: err.to_string(),
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "PasswordHashError",
            message: err.to_string(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest {
            message: format!("Invalid multipart payload: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample_record() -> AttendanceRecord {
        let instant = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
        AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            roll_number: "R1".to_string(),
            student_name: "Ada".to_string(),
            date: instant.date_naive(),
            timestamp: instant,
            method: "manual".to_string(),
            marked_at: instant,
        }
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            Error::bad_request("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::unauthorized("x").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::conflict("x").status(), StatusCode::CONFLICT);
    }

    #[test]
    fn conflict_without_record_omits_attendance_field() {
        let body = serde_json::to_value(Error::conflict("duplicate email")).unwrap();
        assert_eq!(body["error"], "Conflict");
        assert!(body.get("attendance").is_none());
    }

    #[test]
    fn already_marked_embeds_existing_record() {
        let existing = sample_record();
        let body = serde_json::to_value(Error::already_marked(existing.clone())).unwrap();
        assert_eq!(body["error"], "Conflict");
        assert_eq!(body["attendance"]["id"], existing.id.to_string());
        assert_eq!(body["attendance"]["rollNumber"], "R1");
    }

    #[test]
    fn success_envelope_flattens_value() {
        #[derive(Serialize)]
        struct Greeting {
            message: &'static str,
        }
        let body = serde_json::to_value(Success::of(Greeting { message: "hi" })).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "hi");
    }
}
