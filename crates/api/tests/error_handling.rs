//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use fastmal_api::error::AppError;
use fastmal_core::error::CoreError;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Dataset",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Dataset with id 42 not found");
}

#[tokio::test]
async fn missing_dataset_marker_returns_500() {
    let err = AppError::Core(CoreError::Precondition(
        "Dataset 7 does not have the 'FASTMAL_ANNOTATE' tag".into(),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "PRECONDITION_FAILED");
    assert_eq!(
        json["error"],
        "Dataset 7 does not have the 'FASTMAL_ANNOTATE' tag"
    );
}

#[tokio::test]
async fn ambiguous_tag_returns_409_with_match_ids() {
    let err = AppError::Core(CoreError::AmbiguousTag {
        value: "FASTMAL_ROI_COMPLETE".into(),
        matches: vec![3, 9],
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "AMBIGUOUS_TAG");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("FASTMAL_ROI_COMPLETE"));
    assert!(message.contains("3, 9"));
}

#[tokio::test]
async fn ambiguous_label_file_returns_409() {
    let err = AppError::Core(CoreError::AmbiguousLabelFile {
        name: "malaria_RoiLabels.json".into(),
        matches: vec![1, 2],
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "AMBIGUOUS_LABEL_FILE");
}

#[tokio::test]
async fn malformed_label_file_returns_422() {
    let err = AppError::Core(CoreError::MalformedLabelFile {
        name: "malaria_RoiLabels.json".into(),
        reason: "expected an object, found an array".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "MALFORMED_LABEL_FILE");
}

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("Unknown film kind 'x'".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Unknown film kind 'x'");
}

#[tokio::test]
async fn store_error_returns_502_with_cause() {
    let err = AppError::Core(CoreError::Store("connection reset".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "STORE_ERROR");
    assert_eq!(json["error"], "Store error: connection reset");
}

#[tokio::test]
async fn internal_error_is_sanitized() {
    let err = AppError::Core(CoreError::Internal("secret pool state".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("state must be 'true' or 'false', got 'yes'".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}
