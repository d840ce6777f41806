use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    CachedProfile, ContentCandidate, MediaType, ProfileKey, ScoreBreakdown, UserProfile,
    WatchEvent,
};
use crate::services::recommendations::{
    recommend, CandidateFilters, RankedCandidates, ScoredCandidate, Selection,
};
use crate::services::{ScoringOptions, SimilarityScorer, WeightConfig};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub media_type: MediaType,
    pub content: ContentCandidate,
    pub profile: UserProfile,
    /// Falls back to the configured weights for the media type
    pub weights: Option<WeightConfig>,
    pub options: Option<ScoringOptions>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub users: Vec<String>,
    pub media_type: MediaType,
    /// Complete watch history for the users; each event is decoded on its own
    #[serde(default)]
    pub history: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub key: String,
    pub media_type: MediaType,
    pub watched_count: usize,
    /// Malformed history events left out of the profile
    pub skipped: usize,
    pub rebuilt: bool,
    pub profile: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub users: Vec<String>,
    pub media_type: MediaType,
    /// Each candidate is decoded on its own
    pub candidates: Vec<Value>,
    pub limit: Option<usize>,
    pub randomize: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<ScoredCandidate>,
    pub excluded_watched: usize,
    pub excluded_genre: usize,
    pub below_quality: usize,
    /// Candidates that could not be decoded
    pub malformed: usize,
}

impl RecommendationResponse {
    fn new(result: RankedCandidates, malformed: usize) -> Self {
        Self {
            recommendations: result.ranked,
            excluded_watched: result.excluded_watched,
            excluded_genre: result.excluded_genre,
            below_quality: result.below_quality,
            malformed,
        }
    }
}

fn profile_key(media_type: MediaType, users: &[String]) -> AppResult<ProfileKey> {
    ProfileKey::for_users(media_type, users).ok_or_else(|| {
        AppError::InvalidInput("At least one valid user name is required".to_string())
    })
}

/// Decodes each element on its own so one malformed item does not fail the batch.
///
/// Returns the decoded items and the number skipped.
fn decode_each<T: DeserializeOwned>(values: Vec<Value>, kind: &str) -> (Vec<T>, usize) {
    let mut decoded = Vec::with_capacity(values.len());
    let mut skipped = 0;

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value(value) {
            Ok(item) => decoded.push(item),
            Err(e) => {
                skipped += 1;
                tracing::warn!(index, kind, error = %e, "Skipping malformed item");
            }
        }
    }

    (decoded, skipped)
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Score one candidate against a caller-supplied profile
pub async fn score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Json<ScoreResponse> {
    let engine = &state.inner.engine;
    let weights = request
        .weights
        .unwrap_or_else(|| engine.settings(request.media_type).weights.clone());
    let options = request.options.unwrap_or_else(|| engine.scoring.clone());

    let scorer = SimilarityScorer::new(&request.profile, request.media_type, &weights, options);
    let (score, breakdown) = scorer.score(&request.content);

    Json(ScoreResponse { score, breakdown })
}

/// Build or reuse the stored profile for a group of users
pub async fn refresh_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let key = profile_key(request.media_type, &request.users)?;
    let (history, skipped) = decode_each::<WatchEvent>(request.history, "watch event");
    let refreshed = state.inner.profiles.refresh(&key, &history).await?;

    Ok(Json(ProfileResponse {
        key: key.users,
        media_type: key.media_type,
        watched_count: refreshed.snapshot.watched_count,
        skipped,
        rebuilt: refreshed.rebuilt,
        profile: refreshed.snapshot.profile,
    }))
}

/// Get a stored profile snapshot
pub async fn get_profile(
    State(state): State<AppState>,
    Path((media_type, users)): Path<(MediaType, String)>,
) -> AppResult<Json<CachedProfile>> {
    let key = ProfileKey::parse(media_type, &users)
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid profile key '{}'", users)))?;

    state
        .inner
        .profiles
        .get(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No profile for {}", key)))
}

/// Rank candidates against the users' stored profile
pub async fn recommendations(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let key = profile_key(request.media_type, &request.users)?;
    let snapshot = state
        .inner
        .profiles
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No profile for {}, build it first", key)))?;

    let (candidates, malformed) = decode_each(request.candidates, "candidate");
    let engine = &state.inner.engine;
    let settings = engine.settings(request.media_type);
    let selection = Selection {
        limit: request.limit.unwrap_or(settings.limit),
        randomize: request.randomize.unwrap_or(settings.randomize),
        tiers: engine.tiers,
    };

    let result = rank_for_profile(
        engine,
        &snapshot.profile,
        request.media_type,
        candidates,
        &selection,
    );
    Ok(Json(RecommendationResponse::new(result, malformed)))
}

fn rank_for_profile(
    engine: &EngineConfig,
    profile: &UserProfile,
    media_type: MediaType,
    candidates: Vec<ContentCandidate>,
    selection: &Selection,
) -> RankedCandidates {
    let settings = engine.settings(media_type);
    let scorer = SimilarityScorer::new(
        profile,
        media_type,
        &settings.weights,
        engine.scoring.clone(),
    );

    recommend(
        &scorer,
        candidates,
        &CandidateFilters::from(settings),
        &profile.tmdb_ids,
        selection,
        &mut rand::thread_rng(),
    )
}
