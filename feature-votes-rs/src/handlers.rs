//! Feature and vote endpoints.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use error_handling_rs::ApiError;
use input_validation_rs::validators::{finite_non_negative, length_between, max_length, non_negative, one_of};
use input_validation_rs::ValidationBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::{HandlerError, HandlerResult};
use crate::store::{Feature, FeatureChanges, FeatureQuery, NewFeature, Vote};
use crate::AppState;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_LINK_LENGTH: usize = 500;
pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const DEFAULT_TOP_LIMIT: usize = 10;
const VOTE_VALUES: [i64; 2] = [1, -1];

/// JSON body extractor whose rejections are validation failures
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => Err(
                ApiError::application("payload_too_large", "Request body exceeds the size limit", 413)
                    .into(),
            ),
            Err(rejection) => Err(ApiError::invalid_field("body", rejection.body_text()).into()),
        }
    }
}

/// Path extractor whose rejections are validation failures
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(ApiError::invalid_field("path", rejection.body_text()).into()),
        }
    }
}

/// Query extractor whose rejections are validation failures
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ApiError::invalid_field("query", rejection.body_text()).into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFeatureRequest {
    pub title: String,
    pub link: Option<String>,
    pub price_estimate: Option<f64>,
    pub votes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFeatureRequest {
    pub title: Option<String>,
    pub link: Option<String>,
    pub price_estimate: Option<f64>,
    pub votes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub user_id: u64,
    #[serde(default = "default_vote_value")]
    pub value: i64,
}

fn default_vote_value() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub price_lt: Option<f64>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub timestamp: String,
}

fn check_fields(
    title: Option<&str>,
    link: Option<&str>,
    price_estimate: Option<f64>,
    votes: Option<i64>,
) -> HandlerResult<()> {
    ValidationBuilder::new()
        .optional("title", title, |title| length_between(title, 1, MAX_TITLE_LENGTH))
        .optional("link", link, |link| max_length(link, MAX_LINK_LENGTH))
        .optional("price_estimate", price_estimate, finite_non_negative)
        .optional("votes", votes, non_negative)
        .finish()
        .map_err(HandlerError::from)
}

impl CreateFeatureRequest {
    fn validate(self) -> HandlerResult<NewFeature> {
        check_fields(
            Some(&self.title),
            self.link.as_deref(),
            self.price_estimate,
            self.votes,
        )?;
        Ok(NewFeature {
            title: self.title,
            link: self.link,
            price_estimate: self.price_estimate,
            votes: self.votes.unwrap_or(0),
        })
    }
}

impl UpdateFeatureRequest {
    fn validate(self) -> HandlerResult<FeatureChanges> {
        check_fields(
            self.title.as_deref(),
            self.link.as_deref(),
            self.price_estimate,
            self.votes,
        )?;
        Ok(FeatureChanges {
            title: self.title,
            link: self.link,
            price_estimate: self.price_estimate,
            votes: self.votes,
        })
    }
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Feature Votes API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "GET /features",
            "GET /features/top",
            "POST /features",
            "GET /features/{id}",
            "PUT /features/{id}",
            "DELETE /features/{id}",
            "POST /features/{id}/vote"
        ]
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.service_name.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn list_features(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Json<Vec<Feature>> {
    let query = FeatureQuery {
        price_lt: params.price_lt,
        skip: params.skip.unwrap_or(0),
        limit: params.limit.unwrap_or(DEFAULT_LIST_LIMIT),
    };
    Json(state.store.list(query).await)
}

pub async fn top_features(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TopParams>,
) -> Json<Vec<Feature>> {
    Json(state.store.top(params.limit.unwrap_or(DEFAULT_TOP_LIMIT)).await)
}

pub async fn get_feature(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> HandlerResult<Json<Feature>> {
    Ok(Json(state.store.get(id).await?))
}

pub async fn create_feature(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateFeatureRequest>,
) -> HandlerResult<(StatusCode, Json<Feature>)> {
    let feature = state.store.create(request.validate()?).await;
    info!(feature_id = feature.id, "Feature created");
    Ok((StatusCode::CREATED, Json(feature)))
}

pub async fn update_feature(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<UpdateFeatureRequest>,
) -> HandlerResult<Json<Feature>> {
    let feature = state.store.update(id, request.validate()?).await?;
    info!(feature_id = id, "Feature updated");
    Ok(Json(feature))
}

pub async fn delete_feature(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> HandlerResult<Json<serde_json::Value>> {
    state.store.delete(id).await?;
    info!(feature_id = id, "Feature deleted");
    Ok(Json(json!({ "message": "feature deleted successfully" })))
}

pub async fn vote_feature(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<VoteRequest>,
) -> HandlerResult<Json<Vote>> {
    if one_of(request.value, &VOTE_VALUES).is_err() {
        return Err(ApiError::invalid_vote_value(request.value).into());
    }
    let vote = state.store.record_vote(request.user_id, id, request.value).await?;
    info!(feature_id = id, user_id = request.user_id, value = request.value, "Vote recorded");
    Ok(Json(vote))
}

pub async fn not_found(uri: Uri) -> HandlerError {
    ApiError::not_found(&format!("Route {}", uri.path())).into()
}
