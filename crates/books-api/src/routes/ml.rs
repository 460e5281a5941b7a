//! Machine-learning endpoints: feature matrix, training export and
//! prediction intake

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use books_analytics::{ExportFormat, FeatureMatrix, csv_file_name};
use chrono::Utc;

use crate::context::AppState;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::schema::{FeatureParams, PredictionAck, PredictionBatch, TrainingDataParams};

pub fn ml_routes() -> Router<AppState> {
    Router::new()
        .route("/ml/features", get(features))
        .route("/ml/training-data", get(training_data))
        .route("/ml/predictions", post(submit_predictions))
}

async fn features(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<FeatureParams>,
) -> ApiResult<Json<FeatureMatrix>> {
    Ok(Json(state.analytics.ml_features(params.limit).await?))
}

async fn training_data(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TrainingDataParams>,
) -> ApiResult<Response> {
    let report = state.analytics.training_data().await?;

    match params.format {
        ExportFormat::Json => Ok(Json(report).into_response()),
        ExportFormat::Csv => {
            let body = report.to_csv()?;
            let disposition = format!(
                "attachment; filename={}",
                csv_file_name(Utc::now().date_naive())
            );
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}

/// Predictions are validated and acknowledged; they are not stored.
async fn submit_predictions(
    ApiJson(batch): ApiJson<PredictionBatch>,
) -> ApiResult<Json<PredictionAck>> {
    batch.validate()?;

    tracing::info!(
        model_name = %batch.model_name,
        count = batch.predictions.len(),
        submitted_at = ?batch.timestamp,
        "Predictions received"
    );

    Ok(Json(PredictionAck {
        status: "success".to_string(),
        message: format!(
            "Received {} predictions from model {}",
            batch.predictions.len(),
            batch.model_name
        ),
        predictions_received: batch.predictions.len(),
        model_name: batch.model_name,
    }))
}
