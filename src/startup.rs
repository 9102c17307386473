use actix_web::dev::Server;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::configuration::{Settings, StorageBackend};
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    delete_users, health_check, list_users, login, logout_access, logout_refresh, refresh,
    register, secret,
};
use crate::session::SessionController;
use crate::store::{
    migrate, CredentialStore, InMemoryCredentialStore, InMemoryRevocationStore,
    PgCredentialStore, PgRevocationStore, RevocationStore,
};

/// Build the session controller for the configured storage backend.
pub async fn build_sessions(settings: &Settings) -> Result<SessionController, AppError> {
    let (credentials, revocations): (Arc<dyn CredentialStore>, Arc<dyn RevocationStore>) =
        match settings.application.storage {
            StorageBackend::Postgres => {
                tracing::info!("Attempting to connect to database");
                let pool = PgPoolOptions::new()
                    .max_connections(settings.database.max_connections)
                    .connect(&settings.database.connection_string())
                    .await?;
                migrate(&pool).await?;
                tracing::info!("Database connection pool created and migrated");
                (
                    Arc::new(PgCredentialStore::new(pool.clone())),
                    Arc::new(PgRevocationStore::new(pool)),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; users and revocations are not durable");
                (
                    Arc::new(InMemoryCredentialStore::new()),
                    Arc::new(InMemoryRevocationStore::new()),
                )
            }
        };

    Ok(SessionController::build(settings, credentials, revocations))
}

pub fn run(listener: TcpListener, sessions: SessionController) -> Result<Server, std::io::Error> {
    let sessions = web::Data::new(sessions);

    let server = HttpServer::new(move || {
        let validator = sessions.validator().clone();

        App::new()
            // Global middleware
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*")))

            // Shared state
            .app_data(sessions.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
            }))

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/registration", web::post().to(register))
            .route("/login", web::post().to(login))
            .service(
                web::resource("/users")
                    .route(web::get().to(list_users))
                    .route(web::delete().to(delete_users)),
            )

            // Access-token routes
            .service(
                web::resource("/logout/access")
                    .wrap(JwtMiddleware::access(validator.clone()))
                    .route(web::post().to(logout_access)),
            )
            .service(
                web::resource("/secret")
                    .wrap(JwtMiddleware::access(validator.clone()))
                    .route(web::get().to(secret)),
            )

            // Refresh-token routes
            .service(
                web::resource("/logout/refresh")
                    .wrap(JwtMiddleware::refresh(validator.clone()))
                    .route(web::post().to(logout_refresh)),
            )
            .service(
                web::resource("/token/refresh")
                    .wrap(JwtMiddleware::refresh(validator))
                    .route(web::post().to(refresh)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
