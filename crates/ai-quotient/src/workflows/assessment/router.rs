use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::PillarType;
use super::domain::{AnswerInput, AttemptId};
use super::engine::{EngineError, EngineSnapshot};
use super::service::{AssessmentService, AssessmentServiceError};
use super::session::SubmitStatus;
use super::submission::ResultsSubmitter;
use super::validation::{CompanyForm, ContactForm, FieldError};
use super::views::{AssessmentView, QuestionView};
use crate::telemetry::TelemetrySink;

type SharedService<S, T> = Arc<AssessmentService<S, T>>;

/// Router exposing the assessment intents over HTTP.
pub fn assessment_router<S, T>(service: SharedService<S, T>) -> Router
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    Router::new()
        .route("/api/v1/assessments", post(start_handler::<S, T>))
        .route("/api/v1/assessments/catalog", get(catalog_handler::<S, T>))
        .route("/api/v1/assessments/resume", post(resume_handler::<S, T>))
        .route(
            "/api/v1/assessments/:attempt_id",
            get(view_handler::<S, T>).delete(discard_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:attempt_id/snapshot",
            get(snapshot_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:attempt_id/user-info",
            post(user_info_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:attempt_id/answers",
            post(answer_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:attempt_id/previous",
            post(previous_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:attempt_id/test-mode",
            post(test_mode_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:attempt_id/test-mode/shortcut",
            post(test_shortcut_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:attempt_id/results",
            post(results_handler::<S, T>),
        )
        .with_state(service)
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogSectionView {
    pillar: PillarType,
    label: &'static str,
    questions: Vec<QuestionView>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestModeRequest {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct ResultsResponse {
    submission: SubmitStatus,
    assessment: AssessmentView,
}

fn not_found(error: AssessmentServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

fn engine_error(error: EngineError) -> Response {
    match error {
        EngineError::Validation(errors) => {
            let payload = json!({
                "error": errors.to_string(),
                "fields": errors.errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        EngineError::QuestionMismatch { .. } | EngineError::UnknownOption { .. } => {
            let field = match &error {
                EngineError::QuestionMismatch { .. } => "question_id",
                _ => "option_id",
            };
            let payload = json!({
                "error": error.to_string(),
                "fields": [FieldError {
                    field: field.to_string(),
                    message: error.to_string(),
                }],
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        EngineError::InvalidPhase { .. }
        | EngineError::TestModeDisabled
        | EngineError::InvalidStep(_) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
    }
}

fn view_response(outcome: Result<AssessmentView, EngineError>) -> Response {
    match outcome {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => engine_error(error),
    }
}

pub(crate) async fn start_handler<S, T>(State(service): State<SharedService<S, T>>) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    let session = service.start();
    (StatusCode::CREATED, Json(session.view())).into_response()
}

pub(crate) async fn catalog_handler<S, T>(State(service): State<SharedService<S, T>>) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    let sections: Vec<CatalogSectionView> = service
        .catalog()
        .sections()
        .iter()
        .map(|section| CatalogSectionView {
            pillar: section.pillar,
            label: section.pillar.label(),
            questions: section
                .questions
                .iter()
                .map(|question| QuestionView::new(question, None))
                .collect(),
        })
        .collect();

    (StatusCode::OK, Json(json!({ "sections": sections }))).into_response()
}

pub(crate) async fn resume_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Json(snapshot): Json<EngineSnapshot>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    let session = service.resume(snapshot);
    (StatusCode::CREATED, Json(session.view())).into_response()
}

pub(crate) async fn view_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.get(&AttemptId(attempt_id)) {
        Ok(session) => (StatusCode::OK, Json(session.view())).into_response(),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn discard_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.discard(&AttemptId(attempt_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn snapshot_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.get(&AttemptId(attempt_id)) {
        Ok(session) => (StatusCode::OK, Json(session.snapshot())).into_response(),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn user_info_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
    Json(form): Json<CompanyForm>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.get(&AttemptId(attempt_id)) {
        Ok(session) => view_response(session.submit_user_info(&form)),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn answer_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
    Json(input): Json<AnswerInput>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.get(&AttemptId(attempt_id)) {
        Ok(session) => view_response(session.submit_answer(&input)),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn previous_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.get(&AttemptId(attempt_id)) {
        Ok(session) => view_response(session.go_previous()),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn test_mode_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
    Json(request): Json<TestModeRequest>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.get(&AttemptId(attempt_id)) {
        Ok(session) => view_response(session.set_test_mode(request.enabled)),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn test_shortcut_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    match service.get(&AttemptId(attempt_id)) {
        Ok(session) => view_response(session.apply_test_shortcut()),
        Err(error) => not_found(error),
    }
}

pub(crate) async fn results_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path(attempt_id): Path<String>,
    Json(form): Json<ContactForm>,
) -> Response
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    let session = match service.get(&AttemptId(attempt_id)) {
        Ok(session) => session,
        Err(error) => return not_found(error),
    };

    match session.submit_results(&form).await {
        Ok(submission) => {
            let status = match submission {
                SubmitStatus::AlreadyInFlight => StatusCode::ACCEPTED,
                _ => StatusCode::OK,
            };
            let body = ResultsResponse {
                submission,
                assessment: session.view(),
            };
            (status, Json(body)).into_response()
        }
        Err(error) => engine_error(error),
    }
}
