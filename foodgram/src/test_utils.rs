//! Test fixtures: a cheap config, app state, an in-process server and database records.

use crate::{
    AppState,
    api::models::tags::DEFAULT_TAG_COLOR,
    auth::{
        password::{self, Argon2Params},
        tokens,
    },
    config::{Config, PasswordConfig, PoolSettings},
    db::{
        handlers::{AuthTokens, Ingredients, Recipes, Repository, Tags, Users},
        models::{
            ingredients::{IngredientCreateDBRequest, IngredientDBResponse},
            recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeIngredientLine},
            tags::{TagCreateDBRequest, TagDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    storage::{LocalMediaStorage, MediaStorage, decode_data_url},
    types::{IngredientId, TagId, UserId},
};
use axum::http::{HeaderName, HeaderValue, header};
use axum_test::TestServer;
use sqlx::PgPool;
use std::{path::PathBuf, sync::Arc};
use uuid::Uuid;

/// Password every fixture user is created with.
pub const TEST_PASSWORD: &str = "test-password-123";

/// 1x1 transparent png as an upload payload.
pub const TEST_IMAGE: &str =
    "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

// Argon2 at production cost makes every fixture user take ~100ms
const TEST_ARGON2: Argon2Params = Argon2Params {
    memory_kib: 128,
    iterations: 1,
    parallelism: 1,
};

fn test_media_root() -> PathBuf {
    std::env::temp_dir().join(format!("foodgram-test-media-{}", std::process::id()))
}

fn test_storage() -> LocalMediaStorage {
    LocalMediaStorage::new(test_media_root(), "/media")
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        // Will get overridden by the pool sqlx::test hands us
        database_url: "postgres://unused".to_string(),
        pool: PoolSettings {
            max_connections: 1,
            min_connections: 0,
            ..Default::default()
        },
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        enable_otel_export: false,
        auth: crate::config::AuthConfig {
            password: PasswordConfig {
                argon2_memory_kib: TEST_ARGON2.memory_kib,
                argon2_iterations: TEST_ARGON2.iterations,
                argon2_parallelism: TEST_ARGON2.parallelism,
                ..Default::default()
            },
            ..Default::default()
        },
        pagination: Default::default(),
        subscriptions: Default::default(),
        media: crate::config::MediaConfig {
            root: test_media_root(),
            url: "/media".to_string(),
            ..Default::default()
        },
    }
}

pub fn create_test_state(pool: PgPool) -> AppState {
    AppState::builder()
        .db(pool)
        .config(create_test_config())
        .storage(Arc::new(test_storage()))
        .build()
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let state = create_test_state(pool);
    let router = crate::build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub async fn create_test_user_named(pool: &PgPool, username: &str, is_staff: bool) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let password_hash = password::hash_password(TEST_PASSWORD, TEST_ARGON2).expect("Failed to hash password");

    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: Some(password_hash),
            is_staff,
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_user(pool: &PgPool, is_staff: bool) -> UserDBResponse {
    let username = format!("testuser_{}", Uuid::new_v4().simple());
    create_test_user_named(pool, &username, is_staff).await
}

pub async fn issue_test_token(pool: &PgPool, user_id: UserId) -> String {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let token = tokens::generate_token();
    AuthTokens::new(&mut conn)
        .issue(user_id, &tokens::token_digest(&token))
        .await
        .expect("Failed to issue token");
    token
}

/// A fresh user together with a valid API token for them.
pub async fn create_authed_user(pool: &PgPool, is_staff: bool) -> (UserDBResponse, String) {
    let user = create_test_user(pool, is_staff).await;
    let token = issue_test_token(pool, user.id).await;
    (user, token)
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    let value = HeaderValue::from_str(&format!("Token {token}")).expect("Invalid header value");
    (header::AUTHORIZATION, value)
}

pub async fn create_test_tag(pool: &PgPool, slug: &str) -> TagDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Tags::new(&mut conn)
        .create(&TagCreateDBRequest {
            name: slug.to_string(),
            color: DEFAULT_TAG_COLOR.to_string(),
            slug: slug.to_string(),
        })
        .await
        .expect("Failed to create test tag")
}

pub async fn create_test_ingredient(pool: &PgPool, name: &str, measurement_unit: &str) -> IngredientDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Ingredients::new(&mut conn)
        .create(&IngredientCreateDBRequest {
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        })
        .await
        .expect("Failed to create test ingredient")
}

async fn insert_test_recipe(pool: &PgPool, author_id: UserId, tags: Vec<TagId>, ingredients: Vec<RecipeIngredientLine>) -> RecipeDBResponse {
    let storage = test_storage();
    let image = decode_data_url(TEST_IMAGE, 1024).expect("Invalid test image");
    let image_key = storage.store("recipes", &image).await.expect("Failed to store test image");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Recipes::new(&mut conn)
        .create(&RecipeCreateDBRequest {
            author_id,
            name: format!("Recipe {}", Uuid::new_v4().simple()),
            image: image_key,
            text: "Mix everything and cook.".to_string(),
            cooking_time: 15,
            tags,
            ingredients,
        })
        .await
        .expect("Failed to create test recipe")
}

/// A recipe with its own fresh tag and a single ingredient line.
pub async fn create_test_recipe(pool: &PgPool, author_id: UserId) -> RecipeDBResponse {
    let suffix = Uuid::new_v4().simple().to_string();
    let tag = create_test_tag(pool, &format!("tag-{suffix}")).await;
    let ingredient = create_test_ingredient(pool, &format!("ingredient-{suffix}"), "g").await;

    insert_test_recipe(
        pool,
        author_id,
        vec![tag.id],
        vec![RecipeIngredientLine {
            ingredient_id: ingredient.id,
            amount: 1,
        }],
    )
    .await
}

/// A recipe with the given `(ingredient, amount)` lines and a fresh tag.
pub async fn create_test_recipe_with(pool: &PgPool, author_id: UserId, lines: &[(IngredientId, i32)]) -> RecipeDBResponse {
    let tag = create_test_tag(pool, &format!("tag-{}", Uuid::new_v4().simple())).await;
    let ingredients = lines
        .iter()
        .map(|&(ingredient_id, amount)| RecipeIngredientLine { ingredient_id, amount })
        .collect();

    insert_test_recipe(pool, author_id, vec![tag.id], ingredients).await
}

/// A recipe with exactly the given tags and a single fresh ingredient line.
pub async fn create_test_recipe_tagged(pool: &PgPool, author_id: UserId, tags: &[TagId]) -> RecipeDBResponse {
    let ingredient = create_test_ingredient(pool, &format!("ingredient-{}", Uuid::new_v4().simple()), "g").await;

    insert_test_recipe(
        pool,
        author_id,
        tags.to_vec(),
        vec![RecipeIngredientLine {
            ingredient_id: ingredient.id,
            amount: 1,
        }],
    )
    .await
}
