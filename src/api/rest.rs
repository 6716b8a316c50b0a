// =============================================================================
// REST API Endpoints - Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Read endpoints and the ladder
// calculator are public; changing the scoring policy requires a valid Bearer
// token checked via the `AuthBearer` extractor.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::{self, AnalysisReport, AnalysisRequest};
use crate::api::auth::AuthBearer;
use crate::app_state::{AppState, ServiceStats};
use crate::error::AnalysisError;
use crate::ladder::{self, LadderSide};
use crate::signals::ScoringPolicy;
use crate::types::FlowFigures;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/analysis", get(analyze_default))
        .route("/api/v1/analysis/:ticker", get(analyze_ticker))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/ladder/extend", post(extend_ladder))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/config/policy", post(set_policy))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AnalysisError::InsufficientData => StatusCode::UNPROCESSABLE_ENTITY,
            AnalysisError::DataUnavailable { .. } => StatusCode::BAD_GATEWAY,
        };
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    #[serde(flatten)]
    stats: ServiceStats,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        stats: state.stats(),
    };
    Json(resp)
}

// =============================================================================
// Analysis (public)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct AnalysisQuery {
    #[serde(default)]
    policy: Option<String>,
    #[serde(default)]
    lookback_days: Option<u32>,
    /// Manual flow figures in lots, used when the exchange feed is unavailable.
    #[serde(default)]
    foreign: Option<i64>,
    #[serde(default)]
    investment: Option<i64>,
    #[serde(default)]
    dealer: Option<i64>,
}

impl AnalysisQuery {
    fn into_request(self, ticker: String) -> Result<AnalysisRequest, AnalysisError> {
        let policy = self
            .policy
            .as_deref()
            .map(str::parse::<ScoringPolicy>)
            .transpose()
            .map_err(AnalysisError::InvalidInput)?;

        let manual_flow = if self.foreign.is_some()
            || self.investment.is_some()
            || self.dealer.is_some()
        {
            Some(FlowFigures::from_lots(
                self.foreign.unwrap_or(0),
                self.investment.unwrap_or(0),
                self.dealer.unwrap_or(0),
            ))
        } else {
            None
        };

        Ok(AnalysisRequest {
            ticker,
            policy,
            lookback_days: self.lookback_days,
            manual_flow,
        })
    }
}

async fn analyze_ticker(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisReport>, AnalysisError> {
    serve_analysis(&state, Some(ticker), query).await
}

/// Same as `analyze_ticker` for the configured default ticker.
async fn analyze_default(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisReport>, AnalysisError> {
    serve_analysis(&state, None, query).await
}

async fn serve_analysis(
    state: &AppState,
    ticker: Option<String>,
    query: AnalysisQuery,
) -> Result<Json<AnalysisReport>, AnalysisError> {
    let config = state.config_snapshot();
    let ticker = ticker.unwrap_or_else(|| config.default_ticker.clone());
    let request = query.into_request(ticker)?;

    let outcome = analysis::run(&state.sources(), &config, request).await;
    state.record_outcome(outcome.is_ok());

    match outcome {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "analysis failed");
            Err(e)
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config_snapshot())
}

#[derive(Deserialize)]
struct PolicyUpdate {
    policy: ScoringPolicy,
}

async fn set_policy(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(update): Json<PolicyUpdate>,
) -> impl IntoResponse {
    let (previous, config_clone) = {
        let mut config = state.runtime_config.write();
        let previous = config.scoring_policy;
        config.scoring_policy = update.policy;
        (previous, config.clone())
    };

    if previous != update.policy {
        info!(from = %previous, to = %update.policy, "scoring policy updated");

        // Save to disk (best-effort).
        if let Err(e) = config_clone.save(&state.config_path) {
            warn!(error = %e, "Failed to save scoring policy to disk");
        }
    }

    Json(serde_json::json!({
        "scoring_policy": update.policy,
        "changed": previous != update.policy,
    }))
}

// =============================================================================
// Price ladder (public, stateless)
// =============================================================================

#[derive(Debug, Deserialize)]
struct LadderRequest {
    /// Existing ascending ladder; seeded from `reference_price` when absent.
    #[serde(default)]
    ladder: Option<Vec<f64>>,
    #[serde(default)]
    reference_price: Option<f64>,
    steps: usize,
    side: LadderSide,
}

#[derive(Debug, Serialize)]
struct LadderResponse {
    ladder: Vec<f64>,
}

async fn extend_ladder(
    Json(req): Json<LadderRequest>,
) -> Result<Json<LadderResponse>, AnalysisError> {
    let mut levels = match (req.ladder, req.reference_price) {
        (Some(levels), _) if !levels.is_empty() => levels,
        (_, Some(price)) => ladder::seed(price)?,
        _ => {
            return Err(AnalysisError::InvalidInput(
                "either a non-empty ladder or a reference_price is required".to_string(),
            ))
        }
    };
    ladder::extend_ladder(&mut levels, req.steps, req.side)?;
    Ok(Json(LadderResponse { ladder: levels }))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(RuntimeConfig::default(), "unused.json").unwrap();
        router(Arc::new(state))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn error_kinds_map_to_status_codes() {
        let cases = [
            (AnalysisError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AnalysisError::InsufficientData, StatusCode::UNPROCESSABLE_ENTITY),
            (AnalysisError::unavailable("bars", "timeout"), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn manual_lots_become_flow_figures() {
        let query = AnalysisQuery {
            foreign: Some(3),
            dealer: Some(-1),
            ..Default::default()
        };
        let request = query.into_request("2330.TW".into()).unwrap();
        assert_eq!(request.manual_flow, Some(FlowFigures::from_lots(3, 0, -1)));
        assert!(request.policy.is_none());

        let empty = AnalysisQuery::default().into_request("2330.TW".into()).unwrap();
        assert!(empty.manual_flow.is_none());
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let resp = app()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["analyses_served"], 0);
    }

    #[tokio::test]
    async fn unknown_policy_is_a_bad_request() {
        let resp = app()
            .oneshot(
                Request::get("/api/v1/analysis/2330.TW?policy=astrology")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "invalid_input");
    }

    #[tokio::test]
    async fn out_of_range_lookback_is_rejected_before_fetching() {
        let resp = app()
            .oneshot(
                Request::get("/api/v1/analysis/2330.TW?lookback_days=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ladder_extends_from_reference_price() {
        let req = Request::post("/api/v1/ladder/extend")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"reference_price": 99.9, "steps": 2, "side": "up"}"#,
            ))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["ladder"], serde_json::json!([99.9, 100.0, 100.5]));
    }

    #[tokio::test]
    async fn ladder_without_anchor_is_rejected() {
        let req = Request::post("/api/v1/ladder/extend")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"ladder": [], "steps": 2, "side": "down"}"#))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn policy_change_requires_a_token() {
        let req = Request::post("/api/v1/config/policy")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"policy": "heuristic"}"#))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
