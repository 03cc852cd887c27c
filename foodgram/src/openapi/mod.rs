//! OpenAPI documentation for the REST API mounted at `/api`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// `Authorization: Token <key>` header scheme.
struct TokenSecurityAddon;

impl Modify for TokenSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "TokenAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Token obtained from `POST /auth/token/login/`, sent as:\n\n\
                     ```\nAuthorization: Token YOUR_TOKEN\n```",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api", description = "Foodgram API")
    ),
    modifiers(&TokenSecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::users::list_users,
        api::handlers::users::register_user,
        api::handlers::users::get_user,
        api::handlers::users::get_current_user,
        api::handlers::users::set_password,
        api::handlers::users::list_subscriptions,
        api::handlers::users::subscribe,
        api::handlers::users::unsubscribe,
        api::handlers::tags::list_tags,
        api::handlers::tags::get_tag,
        api::handlers::tags::create_tag,
        api::handlers::tags::update_tag,
        api::handlers::tags::delete_tag,
        api::handlers::ingredients::list_ingredients,
        api::handlers::ingredients::get_ingredient,
        api::handlers::ingredients::create_ingredient,
        api::handlers::ingredients::update_ingredient,
        api::handlers::ingredients::delete_ingredient,
        api::handlers::recipes::list_recipes,
        api::handlers::recipes::get_recipe,
        api::handlers::recipes::create_recipe,
        api::handlers::recipes::update_recipe,
        api::handlers::recipes::delete_recipe,
        api::handlers::recipes::add_favorite,
        api::handlers::recipes::remove_favorite,
        api::handlers::recipes::add_to_cart,
        api::handlers::recipes::remove_from_cart,
        api::handlers::recipes::download_shopping_cart,
    ),
    components(
        schemas(
            api::models::auth::TokenLoginRequest,
            api::models::auth::TokenResponse,
            api::models::users::UserCreate,
            api::models::users::UserResponse,
            api::models::users::SetPasswordRequest,
            api::models::users::SubscriptionResponse,
            api::models::tags::TagCreate,
            api::models::tags::TagUpdate,
            api::models::tags::TagResponse,
            api::models::ingredients::IngredientCreate,
            api::models::ingredients::IngredientUpdate,
            api::models::ingredients::IngredientResponse,
            api::models::recipes::RecipeIngredientInput,
            api::models::recipes::RecipeCreate,
            api::models::recipes::RecipeUpdate,
            api::models::recipes::RecipeIngredientResponse,
            api::models::recipes::RecipeResponse,
            api::models::recipes::RecipeSummary,
        )
    ),
    tags(
        (name = "authentication", description = "Exchange credentials for an API token and revoke it."),
        (name = "users", description = "Registration, public profiles and password changes."),
        (name = "subscriptions", description = "Follow authors. Each followed author comes with a preview of their newest recipes."),
        (name = "tags", description = "Recipe tags. Anyone can read them; only staff can change them."),
        (name = "ingredients", description = "Ingredient catalog. `name` filters by substring, with prefix matches listed first."),
        (name = "recipes", description = "Publish, browse and edit recipes. Only the author or staff can change a recipe."),
        (name = "favorites", description = "Mark recipes as favorites."),
        (name = "shopping-cart", description = "Collect recipes to cook and download the combined ingredient list."),
    ),
    info(
        title = "Foodgram API",
        version = "1.0.0",
        description = "Recipe sharing with subscriptions, favorites and shopping lists.

## Authentication

Obtain a token from `POST /auth/token/login/` and pass it on every request:

```
Authorization: Token YOUR_TOKEN
```

Read endpoints also work anonymously, but an invalid token is always rejected.

## Errors

Validation failures return `400` with messages keyed by field:

```json
{ \"errors\": { \"cooking_time\": [\"Cooking time must be at least 1 minute.\"] } }
```

Other errors return `{ \"detail\": \"...\" }`.",
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_paths_and_security() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/recipes/{id}/"));
        assert!(doc.paths.paths.contains_key("/recipes/download_shopping_cart/"));
        assert!(doc.paths.paths.contains_key("/users/{id}/subscribe/"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("TokenAuth"));
        assert!(components.schemas.contains_key("RecipeResponse"));
    }
}
