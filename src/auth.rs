use std::sync::Arc;

use axum::extract::Multipart;
use axum::{Extension, Json};
use chrono::Utc;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::err::Error;
use crate::models::{StudentData, StudentProfile};
use crate::store::PhotoStore;
use crate::token::issue_token;
use crate::{breaks, establishes, proceeds, Payload};

pub fn hash_password(plaintext: &str) -> Result<String, Error> {
    Pbkdf2
        .hash_password(plaintext.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(Error::from)
}

pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash).map_err(Error::from)?;
    Ok(Pbkdf2.verify_password(plaintext.as_bytes(), &parsed).is_ok())
}

pub async fn register(
    Extension(pg): Extension<PgPool>,
    Extension(photos): Extension<PhotoStore>,
    Extension(config): Extension<Arc<Config>>,
    multipart: Multipart,
) -> Payload<RegisteredStudent> {
    let form = read_registration(multipart).await?;
    let (name, roll_number, email, password) =
        match (form.name, form.roll_number, form.email, form.password) {
            (Some(name), Some(roll), Some(email), Some(password))
                if !name.is_empty()
                    && !roll.is_empty()
                    && !email.is_empty()
                    && !password.is_empty() =>
            {
                (name, roll, email, password)
            }
            _ => return breaks(Error::bad_request("All fields are required")),
        };

    let existing = sqlx::query_as::<_, StudentData>("SELECT * FROM students WHERE email = $1 LIMIT 1")
        .bind(&email)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;
    if existing.is_some() {
        return breaks(Error::conflict("Student with this email already exists"));
    }

    let existing =
        sqlx::query_as::<_, StudentData>("SELECT * FROM students WHERE roll_number = $1 LIMIT 1")
            .bind(&roll_number)
            .fetch_optional(&pg)
            .await
            .map_err(Error::from)?;
    if existing.is_some() {
        return breaks(Error::conflict(
            "Student with this roll number already exists",
        ));
    }

    let password_hash = hash_password(&password)?;

    // Photo goes to the blob store first so the student record is only
    // created after every dependent step has succeeded.
    let mut photo_url = None;
    if let Some(photo) = form.photo {
        photo_url = Some(
            photos
                .save(&roll_number, &photo.file_name, &photo.bytes)
                .await?,
        );
    }

    let now = Utc::now();
    let student = StudentData {
        id: Uuid::new_v4(),
        name,
        roll_number,
        email,
        password_hash,
        photo_url,
        role: "student".to_string(),
        created_at: now,
        updated_at: now,
    };

    let res = sqlx::query(
        "INSERT INTO students(id, name, roll_number, email, password_hash, photo_url, role, created_at, updated_at)
         VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT DO NOTHING",
    )
    .bind(student.id)
    .bind(&student.name)
    .bind(&student.roll_number)
    .bind(&student.email)
    .bind(&student.password_hash)
    .bind(&student.photo_url)
    .bind(&student.role)
    .bind(student.created_at)
    .bind(student.updated_at)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    // Lost a race against a concurrent registration with the same email or
    // roll number; the unique constraints arbitrate.
    if res.rows_affected() < 1 {
        return breaks(Error::conflict(
            "Student with this email or roll number already exists",
        ));
    }

    let token = issue_token(
        &student.id.to_string(),
        &student.email,
        "student",
        Some(student.roll_number.clone()),
        &config.jwt_secret,
    )?;

    log::info!("Registered student {} ({})", student.id, student.roll_number);

    establishes(RegisteredStudent {
        message: "Student registered successfully",
        token,
        student: student.into(),
    })
}

pub async fn login(
    Extension(pg): Extension<PgPool>,
    Extension(config): Extension<Arc<Config>>,
    Json(login): Json<LoginRequest>,
) -> Payload<LoggedInStudent> {
    if login.email.is_empty() || login.password.is_empty() {
        return breaks(Error::bad_request("Email and password are required"));
    }

    let student = sqlx::query_as::<_, StudentData>("SELECT * FROM students WHERE email = $1 LIMIT 1")
        .bind(&login.email)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;

    let student = match student {
        Some(student) => student,
        None => return breaks(Error::unauthorized("Invalid email or password")),
    };

    if !verify_password(&login.password, &student.password_hash)? {
        return breaks(Error::unauthorized("Invalid email or password"));
    }

    let token = issue_token(
        &student.id.to_string(),
        &student.email,
        &student.role,
        Some(student.roll_number.clone()),
        &config.jwt_secret,
    )?;

    proceeds(LoggedInStudent {
        message: "Login successful",
        token,
        student: student.into(),
    })
}

// Admin identity lives in configuration, not in the student directory.
pub async fn admin_login(
    Extension(config): Extension<Arc<Config>>,
    Json(login): Json<LoginRequest>,
) -> Payload<LoggedInAdmin> {
    if login.email.is_empty() || login.password.is_empty() {
        return breaks(Error::bad_request("Email and password are required"));
    }

    if login.email != config.admin_email || login.password != config.admin_password {
        return breaks(Error::unauthorized("Invalid admin credentials"));
    }

    let token = issue_token("admin", &config.admin_email, "admin", None, &config.jwt_secret)?;

    proceeds(LoggedInAdmin {
        message: "Admin login successful",
        token,
        admin: AdminProfile {
            email: config.admin_email.clone(),
            role: "admin",
        },
    })
}

async fn read_registration(mut multipart: Multipart) -> Result<RegistrationForm, Error> {
    let mut form = RegistrationForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("name") => form.name = Some(field.text().await?),
            Some("rollNumber") => form.roll_number = Some(field.text().await?),
            Some("email") => form.email = Some(field.text().await?),
            Some("password") => form.password = Some(field.text().await?),
            Some("photo") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("photo")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                form.photo = Some(PhotoUpload { file_name, bytes });
            }
            _ => {}
        }
    }
    Ok(form)
}

#[derive(Debug, Default)]
struct RegistrationForm {
    name: Option<String>,
    roll_number: Option<String>,
    email: Option<String>,
    password: Option<String>,
    photo: Option<PhotoUpload>,
}

#[derive(Debug)]
struct PhotoUpload {
    file_name: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredStudent {
    message: &'static str,
    token: String,
    student: StudentProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedInStudent {
    message: &'static str,
    token: String,
    student: StudentProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedInAdmin {
    message: &'static str,
    token: String,
    admin: AdminProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    email: String,
    role: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("pw", "not-a-phc-hash").is_err());
    }
}
