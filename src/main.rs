pub mod admin;
pub mod attendance;
pub mod auth;
pub mod config;
pub mod db;
pub mod err;
pub mod models;
pub mod qr;
pub mod report;
pub mod store;
pub mod students;
pub mod token;

use axum::{routing::get, routing::post, response::IntoResponse, Router, Json};

use std::net::SocketAddr;
use std::sync::Arc;
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use serde::Serialize;

use crate::config::Config;
use crate::err::{Error, Success};
use crate::store::PhotoStore;

pub type Payload<T> = axum::response::Result<Reply<T>, Error>;

pub struct Reply<T> {
    status: StatusCode,
    value: Success<T>,
}

impl<T> IntoResponse for Reply<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.status, Json(self.value)).into_response()
    }
}

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Reply {
        status: StatusCode::OK,
        value: Success::of(value),
    })
}

pub fn establishes<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Reply {
        status: StatusCode::CREATED,
        value: Success::of(value),
    })
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Err(err)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Arc::new(Config::from_env()?);
    let pool = db::connect(&config.database_url).await?;
    db::prepare_schema(&pool).await?;
    let photos = PhotoStore::new(&config.photo_dir, &config.photo_base_url);

    let app = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .route(
            "/students/profile",
            get(students::profile).put(students::update_profile),
        )
        .route("/students/qr-code", get(students::qr_code))
        .route("/attendance/mark", post(attendance::mark))
        .route(
            "/attendance/student/:student_id",
            get(attendance::student_attendance),
        )
        .route("/attendance/all", get(attendance::all_attendance))
        .route("/admin/students", get(admin::students))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/export", get(admin::export_csv))
        .route("/admin/attendance", get(admin::attendance))
        .fallback(err::handler404.into_service())
        .layer(Extension(pool))
        .layer(Extension(photos))
        .layer(Extension(config.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("Starting Rollcall HTTP server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
