//! Excuse handlers

use crate::{error::ApiError, AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use excuse_core::{Excuse, NewExcuse, RatingRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct RandomParams {
    lang: Option<String>,
    category: Option<String>,
}

/// `limit` stays a string so that garbage falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    category: Option<String>,
    lang: Option<String>,
    severity: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

/// `lang` and `category` are checked against the allow-lists but do not
/// narrow the draw.
pub async fn random(
    State(state): State<AppState>,
    query: Result<Query<RandomParams>, QueryRejection>,
) -> Result<Json<Excuse>, ApiError> {
    let Query(params) = query?;
    let filter = state
        .policy
        .filter(params.category.as_deref(), params.lang.as_deref(), None)?;
    debug!("Random excuse requested: {:?}", filter);

    let excuse = state
        .store
        .get_random_excuse()
        .await?
        .ok_or_else(|| ApiError::NotFound("No excuses found".to_string()))?;

    info!(
        "Excuse RANDOM: {} - Category: {}, Severity: {}",
        excuse.id, excuse.category, excuse.severity
    );
    Ok(Json(excuse))
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Excuse>>, ApiError> {
    let Query(params) = query?;
    let filter = state.policy.filter(
        params.category.as_deref(),
        params.lang.as_deref(),
        params.severity.as_deref(),
    )?;
    let limit = state.policy.parse_limit(params.limit.as_deref());

    debug!("Listing excuses: filter={:?}, limit={}", filter, limit);

    let excuses = state.store.list_excuses(&filter, limit).await?;
    Ok(Json(excuses))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewExcuse>, JsonRejection>,
) -> Result<(StatusCode, Json<Excuse>), ApiError> {
    let Json(req) = payload?;
    let excuse = state.policy.build_excuse(req)?;

    state.store.create_excuse(&excuse).await?;

    info!(
        "Excuse CREATE: {} - Category: {}, Severity: {}",
        excuse.id, excuse.category, excuse.severity
    );
    Ok((StatusCode::CREATED, Json(excuse)))
}

pub async fn rate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;

    state.store.rate_excuse(&id, req.delta()).await?;

    info!("Excuse RATE: {} ({:+})", id, req.delta());
    Ok(Json(MessageResponse {
        message: "Rating updated".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::storage::MemoryStore;
    use crate::AppState;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use chrono::{TimeZone, Utc};
    use excuse_core::{
        Excuse, ExcuseError, ExcuseFilter, ExcuseStore, Result, Stats, ValidationPolicy,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Fails every call, so any request that reaches storage turns into a 500
    struct BrokenStore;

    #[async_trait]
    impl ExcuseStore for BrokenStore {
        async fn get_random_excuse(&self) -> Result<Option<Excuse>> {
            Err(ExcuseError::Database("connection refused".into()))
        }
        async fn list_excuses(&self, _: &ExcuseFilter, _: usize) -> Result<Vec<Excuse>> {
            Err(ExcuseError::Database("connection refused".into()))
        }
        async fn create_excuse(&self, _: &Excuse) -> Result<()> {
            Err(ExcuseError::Database("connection refused".into()))
        }
        async fn rate_excuse(&self, _: &str, _: i32) -> Result<()> {
            Err(ExcuseError::Database("connection refused".into()))
        }
        async fn get_stats(&self) -> Result<Stats> {
            Err(ExcuseError::Database("connection refused".into()))
        }
        async fn import_excuses(&self, _: Vec<Excuse>) -> Result<usize> {
            Err(ExcuseError::Database("connection refused".into()))
        }
    }

    fn excuse(id: &str, category: &str, rating: i32) -> Excuse {
        Excuse {
            id: id.to_string(),
            text: format!("excuse {}", id),
            category: category.to_string(),
            language: "en".to_string(),
            severity: "medium".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            rating,
        }
    }

    async fn memory_app(excuses: Vec<Excuse>) -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_rng(StdRng::seed_from_u64(1)));
        store.import_excuses(excuses).await.unwrap();
        let app = crate::build_app(AppState {
            store: store.clone(),
            policy: Arc::new(ValidationPolicy::default()),
        });
        (app, store)
    }

    fn broken_app() -> Router {
        crate::build_app(AppState {
            store: Arc::new(BrokenStore),
            policy: Arc::new(ValidationPolicy::default()),
        })
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_sorted_by_rating() {
        let (app, _) = memory_app(vec![excuse("a", "work", 0), excuse("b", "work", 5)]).await;

        let response = app
            .oneshot(get("/api/v1/excuses?category=work&limit=10"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let ids: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_list_uses_default_limit_for_garbage() {
        let items: Vec<_> = (0..15).map(|i| excuse(&format!("e{:02}", i), "tech", i)).collect();
        let (app, _) = memory_app(items).await;

        let response = app
            .oneshot(get("/api/v1/excuses?limit=lots&lang="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_list_invalid_category_never_reaches_storage() {
        let response = broken_app()
            .oneshot(get("/api/v1/excuses?category=nonexistent-category"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["message"], "Invalid category");
    }

    #[tokio::test]
    async fn test_list_invalid_severity() {
        let (app, _) = memory_app(vec![]).await;
        let response = app
            .oneshot(get("/api/v1/excuses?severity=apocalyptic"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid severity");
    }

    #[tokio::test]
    async fn test_backend_failure_is_opaque_500() {
        let response = broken_app().oneshot(get("/api/v1/excuses")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(!body.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_random_empty_store_is_404() {
        let (app, _) = memory_app(vec![]).await;
        let response = app.oneshot(get("/api/v1/excuses/random")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "No excuses found");
    }

    #[tokio::test]
    async fn test_random_validates_but_ignores_filters() {
        let (app, _) = memory_app(vec![excuse("a", "work", 0)]).await;

        let response = app
            .clone()
            .oneshot(get("/api/v1/excuses/random?category=Family&lang=en"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], "a");

        let response = app
            .oneshot(get("/api/v1/excuses/random?lang=klingon"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid language");
    }

    #[tokio::test]
    async fn test_create_excuse() {
        let (app, store) = memory_app(vec![]).await;

        let response = app
            .oneshot(post_json(
                "/api/v1/excuses",
                r#"{"text": "Mercury is in retrograde", "category": "Tech", "language": "en"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["text"], "Mercury is in retrograde");
        assert_eq!(body["category"], "tech");
        assert_eq!(body["severity"], "medium");
        assert_eq!(body["rating"], 0);
        assert!(body["id"].as_str().unwrap().starts_with("exc_"));

        let stored = store.list_excuses(&ExcuseFilter::new(), 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, body["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_create_requires_text() {
        let (app, store) = memory_app(vec![]).await;

        let response = app
            .oneshot(post_json("/api/v1/excuses", r#"{"text": ""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Text is required");

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_excuses, 0);
    }

    #[tokio::test]
    async fn test_random_invalid_filter_never_reaches_storage() {
        let response = broken_app()
            .oneshot(get("/api/v1/excuses/random?category=nonexistent-category"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid category");
    }

    #[tokio::test]
    async fn test_duplicate_query_key_is_json_400() {
        let (app, _) = memory_app(vec![excuse("a", "work", 0)]).await;

        for uri in [
            "/api/v1/excuses?category=work&category=tech",
            "/api/v1/excuses/random?lang=en&lang=fr",
        ] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let body = body_json(response).await;
            assert_eq!(body["error"], "Bad Request");
            assert_eq!(body["message"], "Invalid query parameters");
        }
    }

    #[tokio::test]
    async fn test_create_null_text_requires_text() {
        let (app, _) = memory_app(vec![]).await;

        for payload in [r#"{"text": null}"#, r#"{"category": "work"}"#] {
            let response = app
                .clone()
                .oneshot(post_json("/api/v1/excuses", payload))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["message"], "Text is required");
        }
    }

    #[tokio::test]
    async fn test_create_invalid_json() {
        let (app, _) = memory_app(vec![]).await;
        let response = app
            .oneshot(post_json("/api/v1/excuses", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid JSON");
    }

    #[tokio::test]
    async fn test_rate_excuse() {
        let (app, store) = memory_app(vec![excuse("a", "work", 0)]).await;

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/excuses/a/rate", &json!({"upvote": true}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Rating updated");

        let response = app
            .oneshot(post_json("/api/v1/excuses/a/rate", r#"{"upvote": false}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stored = store.list_excuses(&ExcuseFilter::new(), 1).await.unwrap();
        assert_eq!(stored[0].rating, 0);
    }

    #[tokio::test]
    async fn test_rate_unknown_id_is_404() {
        let (app, _) = memory_app(vec![excuse("a", "work", 0)]).await;
        let response = app
            .oneshot(post_json("/api/v1/excuses/missing/rate", r#"{"upvote": true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "Excuse not found");
    }

    #[tokio::test]
    async fn test_rate_invalid_json() {
        let (app, _) = memory_app(vec![excuse("a", "work", 0)]).await;
        let response = app
            .oneshot(post_json("/api/v1/excuses/a/rate", r#"{"upvote": "yes"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid JSON");
    }

    #[tokio::test]
    async fn test_health() {
        let response = broken_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }
}
