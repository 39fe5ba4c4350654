use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::TokenVerifier;
use crate::config::{AppConfig, AUTH_HEADER};
use crate::database::{PostStore, ProfileStore, UserStore};
use crate::handlers::{protected, public};
use crate::middleware::auth_middleware;

/// Shared, read-only request context. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Arc<TokenVerifier>,
    pub users: Arc<dyn UserStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub posts: Arc<dyn PostStore>,
}

impl AppState {
    /// Wire every store interface to one backend.
    pub fn new<B>(config: AppConfig, backend: Arc<B>) -> Self
    where
        B: UserStore + ProfileStore + PostStore + 'static,
    {
        let verifier = TokenVerifier::new(&config.security);
        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            users: backend.clone(),
            profiles: backend.clone(),
            posts: backend,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(max_body));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router.with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes(state.clone()))
        .merge(profile_routes(state.clone()))
        .merge(post_routes(state))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/auth", get(auth::auth_whoami))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

fn profile_routes(state: AppState) -> Router<AppState> {
    use protected::profile;

    // Methods sharing a path with a public route get the gate on their own MethodRouter
    let gate = || from_fn_with_state(state.clone(), auth_middleware);

    let protected_routes = Router::new()
        .route("/profile/me", get(profile::profile_me))
        .route("/profile/experience", put(profile::experience_add))
        .route("/profile/experience/:exp_id", delete(profile::experience_remove))
        .route("/profile/education", put(profile::education_add))
        .route("/profile/education/:edu_id", delete(profile::education_remove))
        .route_layer(gate());

    Router::new()
        .route(
            "/profile",
            get(public::profile_list).merge(
                post(profile::profile_upsert)
                    .delete(profile::profile_delete_me)
                    .route_layer(gate()),
            ),
        )
        .route(
            "/profile/user/:id",
            get(public::profile_get_by_user).merge(delete(profile::profile_delete_by_user).route_layer(gate())),
        )
        .merge(protected_routes)
}

fn post_routes(state: AppState) -> Router<AppState> {
    use protected::post as handlers;

    Router::new()
        .route("/post", get(handlers::post_list).post(handlers::post_create))
        .route("/post/:id", get(handlers::post_get).delete(handlers::post_delete))
        .route("/post/like/:id", put(handlers::post_like))
        .route("/post/unlike/:id", put(handlers::post_unlike))
        .route("/post/comment/:id", post(handlers::comment_add))
        .route("/post/comment/:id/:comment_id", delete(handlers::comment_remove))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// Permissive when no origins are configured, otherwise limited to the list.
fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }
    if config.security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                HeaderName::from_static(AUTH_HEADER),
            ]),
    )
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.users.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "message": "database unavailable"
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::database::models::User;
    use crate::database::MemoryStore;

    async fn send(router: Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTH_HEADER, token);
        }
        let response = router.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn state() -> AppState {
        AppState::new(AppConfig::development().with_secret("app-test"), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn health_reports_ok_on_memory_store() {
        let (status, body) = send(app(state()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn profile_listing_is_public_but_upsert_is_not() {
        let state = state();
        let (status, body) = send(app(state.clone()), "GET", "/api/profile", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(vec![]));

        let (status, body) = send(app(state), "POST", "/api/profile", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized: missing token");
    }

    #[tokio::test]
    async fn posts_require_a_token() {
        let (status, _) = send(app(state()), "GET", "/api/post", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn whoami_returns_the_user_record() {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("Ada", "ada@example.com", None);
        store.insert_user(user.clone()).await;
        let state = AppState::new(AppConfig::development().with_secret("app-test"), store);
        let token = state.verifier.issue(user.id).unwrap();

        let (status, body) = send(app(state), "GET", "/api/auth", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ada");
        assert_eq!(body["_id"], user.id.to_hex());
    }

    #[tokio::test]
    async fn malformed_profile_id_is_a_bad_request() {
        let (status, body) = send(app(state()), "GET", "/api/profile/user/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Profile not found");
    }

    #[test]
    fn cors_can_be_disabled() {
        let mut config = AppConfig::development();
        config.security.enable_cors = false;
        assert!(cors_layer(&config).is_none());
    }
}
