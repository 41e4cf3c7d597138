pub mod config;
pub mod diagnostics;
pub mod document;
pub mod err;
pub mod models;
pub mod newsletter;
pub mod school;
pub mod store;


use std::sync::Arc;

use axum::handler::Handler;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::{routing::get, routing::post, Extension, Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::err::Error;
use crate::store::Store;

pub type Payload<T> = Result<Json<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(value))
}

pub fn app(store: Store, config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(diagnostics::root))
        .route("/test", get(diagnostics::test_database))
        .route(
            "/teachers",
            get(school::list_teachers).post(school::create_teacher),
        )
        .route(
            "/students",
            get(school::list_students).post(school::create_student),
        )
        .route(
            "/subjects",
            get(school::list_subjects).post(school::create_subject),
        )
        .route(
            "/lectures",
            get(school::list_lectures).post(school::create_lecture),
        )
        .route("/exams", get(school::list_exams).post(school::create_exam))
        .route("/grades", get(school::list_grades).post(school::create_grade))
        .route("/newsletter/subscribe", post(newsletter::subscribe_handler))
        .route("/newsletter/confirm", get(newsletter::confirm_handler))
        .fallback(err::handler404.into_service())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(store))
                .layer(Extension(config))
                .layer(CorsLayer::permissive()),
        )
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down TeachEase HTTP Server");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Arc::new(Config::from_env()?);
    let store = Store::connect(config.database_url.as_deref()).await;

    let addr = config.addr();
    let app = app(store, config);

    log::info!("Starting TeachEase HTTP Server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
