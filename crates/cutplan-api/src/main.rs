use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cutplan_core::{
    group_bars, BarOptimizationRequest, BarOptimizationResult, GroupedBar, LinearOptimizer,
    OptimizedBar, OptimizerError, PanelOptimizationRequest, PanelOptimizationResult,
    PanelOptimizer,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Cutplan API");

    let addr = std::env::var("CUTPLAN_API_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Try: curl http://{}/api/health", addr);

    axum::serve(listener, app()).await?;
    Ok(())
}

fn app() -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/optimize/bars", post(optimize_bars))
        .route("/api/optimize/panels", post(optimize_panels))
        .route("/api/group/bars", post(group))
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "cutplan-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Linear stock optimization endpoint
async fn optimize_bars(
    Json(request): Json<BarOptimizationRequest>,
) -> Result<Json<BarOptimizationResult>, AppError> {
    info!(
        "Received bar optimization request with {} cuts and {} catalog profiles",
        request.cuts.len(),
        request.catalog.len()
    );

    let result = LinearOptimizer::new(request)?.optimize();

    info!(
        "Bar optimization complete: {} bars required, {:.2}% waste, {} rejected",
        result.summary.total_bars,
        result.summary.waste_percentage,
        result.rejected.len()
    );

    Ok(Json(result))
}

/// Panel nesting endpoint
async fn optimize_panels(
    Json(request): Json<PanelOptimizationRequest>,
) -> Result<Json<PanelOptimizationResult>, AppError> {
    info!(
        "Received panel nesting request with {} panels on {}x{} sheets",
        request.panels.len(),
        request.sheet_width,
        request.sheet_height
    );

    let result = PanelOptimizer::new(request)?.optimize();

    info!(
        "Panel nesting complete: {} sheets required, {:.2}% waste, {} rejected",
        result.summary.total_sheets,
        result.summary.waste_percentage,
        result.rejected.len()
    );

    Ok(Json(result))
}

/// Collapses identical bars for reporting
async fn group(Json(bars): Json<Vec<OptimizedBar>>) -> Json<Vec<GroupedBar>> {
    info!("Grouping {} bars", bars.len());
    Json(group_bars(&bars))
}

/// Application error type
struct AppError(anyhow::Error);

impl From<OptimizerError> for AppError {
    fn from(err: OptimizerError) -> Self {
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request error: {}", self.0);

        let status = if self.0.downcast_ref::<OptimizerError>().is_some() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            Json(json!({
                "error": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn post_json(uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_service() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bars_endpoint_returns_plan() {
        let (status, body) = post_json(
            "/api/optimize/bars",
            json!({
                "cuts": [
                    {"profile_code": "X", "length": 2000, "quantity": 3, "kerf": 4,
                     "head_trim": 10, "tail_trim": 10, "stock_length": 6000},
                    {"profile_code": "X", "length": 990, "quantity": 2, "kerf": 4,
                     "head_trim": 10, "tail_trim": 10, "stock_length": 6000}
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["total_bars"], 2);
        assert_eq!(body["profiles"][0]["bars"][0]["tally"], "n°2 2000 - n°1 990");
    }

    #[tokio::test]
    async fn panels_endpoint_rejects_bad_sheet() {
        let (status, body) = post_json(
            "/api/optimize/panels",
            json!({
                "sheet_width": 0,
                "sheet_height": 1000,
                "panels": [{"material": "ALU", "thickness": "3mm",
                            "width": 100, "height": 100, "quantity": 1}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid sheet"));
    }

    #[tokio::test]
    async fn group_endpoint_counts_repeats() {
        let bar = json!({
            "stock_length": 6000, "kerf": 0, "head_trim": 0, "tail_trim": 0,
            "cuts": [{"request_index": 0, "length": 1000,
                      "angles": {"head": 90, "tail": 90}, "kerf": 0}],
            "used_length": 1000, "residual": 5000, "tally": "n°1 1000"
        });

        let (status, body) = post_json("/api/group/bars", json!([bar.clone(), bar])).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["count"], 2);
    }
}
