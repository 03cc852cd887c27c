//! # foodgram: recipe sharing backend
//!
//! `foodgram` is a REST API where users publish recipes, follow authors, mark favorites and
//! collect recipes in a shopping cart whose ingredients download as one combined list.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum) and all persistence is PostgreSQL
//! through sqlx. Uploaded recipe images are decoded from base64 data URLs and written through a
//! [`storage::MediaStorage`] backend, which by default is a local directory served under `/media`.
//!
//! ### Request Flow
//!
//! A request hits a handler in [`api::handlers`]. Handlers that need a caller take the
//! `CurrentUser` extractor from [`auth`], which resolves `Authorization: Token <key>` against
//! the stored token digests. Handlers then work through the repositories in [`db::handlers`],
//! each wrapping one `&mut PgConnection`, and build responses in bulk so a page of recipes
//! costs a fixed number of queries.
//!
//! ### Core Components
//!
//! - [`api`]: handlers and request/response models
//! - [`auth`]: token extraction, password hashing and permission checks
//! - [`db`]: repositories, database models and error mapping
//! - [`shopping_list`]: aggregation of cart ingredients into the downloadable list
//! - [`storage`]: image decoding and media storage
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use foodgram::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = foodgram::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     foodgram::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations run automatically on startup. To run them by hand:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! foodgram::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod shopping_list;
pub mod storage;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::handlers::{auth as auth_handlers, ingredients, recipes, tags, users},
    auth::password::{self, Argon2Params},
    config::CorsOrigin,
    db::{
        handlers::{Ingredients, Repository, Users},
        models::{
            ingredients::IngredientCreateDBRequest,
            users::{UserCreateDBRequest, UserUpdateDBRequest},
        },
    },
    openapi::ApiDoc,
    storage::{LocalMediaStorage, MediaStorage},
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{IngredientId, RecipeId, TagId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .storage(Arc::new(LocalMediaStorage::new(root, "/media")))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub storage: Arc<dyn MediaStorage>,
}

/// Get the foodgram database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Ensure a staff account exists for `email`.
///
/// Idempotent: an existing account is promoted to staff and, when `password` is given, gets that
/// password. Returns the account's id.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, params: Argon2Params, db: &PgPool) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_password_blocking(pwd.to_string(), params).await?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        user_repo
            .update(
                existing_user.id,
                &UserUpdateDBRequest {
                    password_hash,
                    is_staff: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let username = email.split('@').next().filter(|s| !s.is_empty()).unwrap_or("admin").to_string();
    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            username,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            password_hash,
            is_staff: true,
        })
        .await?;

    tx.commit().await?;
    info!(user_id = created_user.id, "Created initial staff user");
    Ok(created_user.id)
}

/// `name,unit` rows. The unit is the last column, so a name may itself contain commas.
fn parse_ingredients_csv(raw: &str) -> anyhow::Result<Vec<IngredientCreateDBRequest>> {
    let mut items = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, unit) = line
            .rsplit_once(',')
            .ok_or_else(|| anyhow::anyhow!("line {}: expected `name,unit`", index + 1))?;
        let name = name.trim().trim_matches('"').trim();
        let unit = unit.trim().trim_matches('"').trim();
        if name.is_empty() || unit.is_empty() {
            anyhow::bail!("line {}: name and unit must not be empty", index + 1);
        }
        items.push(IngredientCreateDBRequest {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        });
    }
    Ok(items)
}

/// Load ingredients from a file: `name,unit` rows for `.csv`, otherwise a JSON array of
/// `{"name", "measurement_unit"}` objects.
///
/// Existing `(name, measurement_unit)` pairs are skipped, so the import can be re-run.
/// Returns `(created, skipped)`.
#[instrument(skip(db), err)]
pub async fn import_ingredients(path: &Path, db: &PgPool) -> anyhow::Result<(usize, usize)> {
    let raw = tokio::fs::read_to_string(path).await?;
    let is_csv = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let items = if is_csv {
        parse_ingredients_csv(&raw)?
    } else {
        serde_json::from_str::<Vec<IngredientCreateDBRequest>>(&raw)?
    };

    let mut tx = db.begin().await?;
    let mut repo = Ingredients::new(&mut tx);
    let mut created = 0;
    for item in &items {
        if repo.create_if_missing(item).await? {
            created += 1;
        }
    }
    tx.commit().await?;

    let skipped = items.len() - created;
    info!(created, skipped, "Imported ingredients");
    Ok((created, skipped))
}

async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .min_connections(config.pool.min_connections)
        .acquire_timeout(config.pool.acquire_timeout)
        .connect(&config.database_url)
        .await?;
    migrator().run(&pool).await?;

    create_initial_admin_user(
        &config.admin_email,
        config.admin_password.as_deref(),
        Argon2Params::from(&config.auth.password),
        &pool,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // tower-http refuses `*` inside an origin list
    let allow_origin = if config
        .auth
        .cors
        .allowed_origins
        .iter()
        .any(|origin| matches!(origin, CorsOrigin::Wildcard))
    {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.auth.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.cors.allow_credentials)
        .expose_headers(vec![http::header::CONTENT_DISPOSITION]);

    if let Some(max_age) = config.auth.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: the `/api` routes, media files, docs, CORS and tracing.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Token authentication
        .route("/auth/token/login/", post(auth_handlers::login))
        .route("/auth/token/logout/", post(auth_handlers::logout))
        // Users and subscriptions
        .route("/users/", get(users::list_users).post(users::register_user))
        .route("/users/me/", get(users::get_current_user))
        .route("/users/set_password/", post(users::set_password))
        .route("/users/subscriptions/", get(users::list_subscriptions))
        .route("/users/{id}/", get(users::get_user))
        .route("/users/{id}/subscribe/", post(users::subscribe).delete(users::unsubscribe))
        // Catalog
        .route("/tags/", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/{id}/", get(tags::get_tag).patch(tags::update_tag).delete(tags::delete_tag))
        .route("/ingredients/", get(ingredients::list_ingredients).post(ingredients::create_ingredient))
        .route(
            "/ingredients/{id}/",
            get(ingredients::get_ingredient)
                .patch(ingredients::update_ingredient)
                .delete(ingredients::delete_ingredient),
        )
        // Recipes, favorites and the shopping cart
        .route("/recipes/", get(recipes::list_recipes).post(recipes::create_recipe))
        .route("/recipes/download_shopping_cart/", get(recipes::download_shopping_cart))
        .route(
            "/recipes/{id}/",
            get(recipes::get_recipe).patch(recipes::update_recipe).delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/{id}/favorite/",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state.clone());

    // base64 inflates images by 4/3; leave room for the rest of the JSON body
    let body_limit = state.config.media.max_image_bytes / 3 * 4 + 64 * 1024;

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit));

    // Absolute media URLs point at some other server; only serve local paths ourselves
    if state.config.media.url.starts_with('/') {
        router = router.nest_service(&state.config.media.url, ServeDir::new(&state.config.media.root));
    }

    // Outermost first: tracing sees every request, including CORS preflights
    let router = router.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(create_cors_layer(&state.config)?),
    );

    Ok(router)
}

/// The configured server: pool, state and router, ready to serve.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Connect to the database, run migrations, ensure the staff user and build the router
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting foodgram with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;

        tokio::fs::create_dir_all(&config.media.root).await?;
        let storage = LocalMediaStorage::new(config.media.root.clone(), config.media.url.clone());

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .storage(Arc::new(storage))
            .build();

        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Foodgram listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{create_initial_admin_user, import_ingredients, parse_ingredients_csv};
    use crate::{
        auth::password::{self, Argon2Params},
        db::handlers::Users,
        test_utils::*,
    };
    use axum::http::{StatusCode, header};
    use sqlx::PgPool;
    use std::io::Write;

    const PARAMS: Argon2Params = Argon2Params {
        memory_kib: 128,
        iterations: 1,
        parallelism: 1,
    };

    #[sqlx::test]
    async fn test_create_initial_admin_user_new_user(pool: PgPool) {
        let user_id = create_initial_admin_user("chief@example.com", Some("kitchen-secret"), PARAMS, &pool)
            .await
            .expect("Should create admin user successfully");

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .get_user_by_email("chief@example.com")
            .await
            .unwrap()
            .expect("User should exist");

        assert_eq!(user.id, user_id);
        assert_eq!(user.username, "chief");
        assert!(user.is_staff);
        assert!(password::verify_password("kitchen-secret", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    async fn test_create_initial_admin_user_existing_user(pool: PgPool) {
        let existing = create_test_user(&pool, false).await;

        let user_id = create_initial_admin_user(&existing.email, None, PARAMS, &pool).await.unwrap();
        assert_eq!(user_id, existing.id);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_user_by_email(&existing.email).await.unwrap().unwrap();
        assert!(user.is_staff);
        // no password given, so the old one still works
        assert!(password::verify_password(TEST_PASSWORD, user.password_hash.as_deref().unwrap()).unwrap());

        let again = create_initial_admin_user(&existing.email, None, PARAMS, &pool).await.unwrap();
        assert_eq!(again, existing.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_import_ingredients_is_idempotent(pool: PgPool) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "salt", "measurement_unit": "g"}}, {{"name": "milk", "measurement_unit": "ml"}}]"#
        )
        .unwrap();

        assert_eq!(import_ingredients(file.path(), &pool).await.unwrap(), (2, 0));
        assert_eq!(import_ingredients(file.path(), &pool).await.unwrap(), (0, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_import_ingredients_from_csv(pool: PgPool) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "salt,g").unwrap();
        writeln!(file, "\"pepper, black\",g").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "milk,ml").unwrap();

        assert_eq!(import_ingredients(file.path(), &pool).await.unwrap(), (3, 0));
        assert_eq!(import_ingredients(file.path(), &pool).await.unwrap(), (0, 3));

        let mut conn = pool.acquire().await.unwrap();
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM ingredients ORDER BY name")
            .fetch_all(&mut *conn)
            .await
            .unwrap();
        assert_eq!(names, ["milk", "pepper, black", "salt"]);
    }

    #[test]
    fn test_csv_rows_need_a_unit() {
        assert!(parse_ingredients_csv("salt").is_err());
        assert!(parse_ingredients_csv("salt,").is_err());
        assert_eq!(parse_ingredients_csv("salt, g \n").unwrap()[0].measurement_unit, "g");
    }

    #[sqlx::test]
    async fn test_import_rejects_malformed_file(pool: PgPool) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "salt"}}"#).unwrap();
        assert!(import_ingredients(file.path(), &pool).await.is_err());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_health_docs_and_media(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let health = app.get("/healthz").add_header(header::ORIGIN, "http://localhost:3000").await;
        health.assert_status_ok();
        assert_eq!(health.header("access-control-allow-origin"), "*");

        let doc = app.get("/api/openapi.json").await;
        doc.assert_status_ok();
        assert!(doc.json::<serde_json::Value>()["paths"]["/recipes/"].is_object());

        app.get("/api/docs").await.assert_status_ok();

        // uploaded images are served back from the media directory
        let (user, _) = create_authed_user(&pool, false).await;
        let recipe = create_test_recipe(&pool, user.id).await;
        let response = app.get(&format!("/media/{}", recipe.image)).await;
        response.assert_status_ok();

        app.get("/media/recipes/missing.png").await.assert_status(StatusCode::NOT_FOUND);
    }
}
