//! DevTrack: a personal task tracker. The server side is an actix-web REST
//! API with bearer-token auth over MongoDB; [`client`] holds the terminal
//! client's API wrapper, local cache and view state.

pub mod analytics;
pub mod app_state;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod tasks;

use actix_web::web;

use crate::auth::{login, me, signup};
use crate::error::ApiError;
use crate::middleware::Authentication;
use crate::tasks::{create_task, delete_task, list_tasks, task_summary, update_task};

/// Registers every `/api` route. Expects `web::Data<AppState>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .service(
                        web::resource("/me")
                            .wrap(Authentication)
                            .route(web::get().to(me)),
                    ),
            )
            .service(
                web::scope("/tasks")
                    .wrap(Authentication)
                    .route("", web::post().to(create_task))
                    .route("", web::get().to(list_tasks))
                    .route("/summary", web::get().to(task_summary))
                    .route("/{id}", web::patch().to(update_task))
                    .route("/{id}", web::delete().to(delete_task)),
            ),
    );
}
