use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use bear_classifier::{Classifier, ClassifierError, Prediction};
use tracing::{debug, warn};

use crate::page;

static READY: AtomicBool = AtomicBool::new(false);

pub fn mark_ready() {
    READY.store(true, Ordering::SeqCst);
}

#[derive(Clone)]
pub struct AppState {
    classifier: Arc<Classifier>,
    example_image: Option<PathBuf>,
}

impl AppState {
    pub fn new(classifier: Arc<Classifier>, example_image: Option<PathBuf>) -> Self {
        Self {
            classifier,
            example_image,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(classify_upload))
        .route("/api/predict", post(api_predict))
        .route("/api/predict/example", get(api_predict_example))
        .route("/example.jpg", get(example_image))
        .route("/live", get(live))
        .route("/ready", get(ready))
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::index(state.example_image.is_some()))
}

/// Outcome of scanning a multipart upload for the `image` field.
enum UploadField {
    Image(Bytes),
    Missing,
    Bad(String),
}

async fn image_field(mut multipart: Multipart) -> UploadField {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("image") {
                    continue;
                }
                return match field.bytes().await {
                    Ok(b) => UploadField::Image(b),
                    Err(e) => UploadField::Bad(format!("upload failed: {e}")),
                };
            }
            Ok(None) => return UploadField::Missing,
            Err(e) => return UploadField::Bad(format!("bad request: {e}")),
        }
    }
}

async fn classify_upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let has_example = state.example_image.is_some();
    let bytes = match image_field(multipart).await {
        UploadField::Image(b) => b,
        UploadField::Missing => {
            return (
                StatusCode::BAD_REQUEST,
                Html(page::with_error(has_example, "no image field in upload")),
            )
                .into_response()
        }
        UploadField::Bad(msg) => {
            return (
                StatusCode::BAD_REQUEST,
                Html(page::with_error(has_example, &msg)),
            )
                .into_response()
        }
    };
    match run_predict(&state, bytes.to_vec()).await {
        Ok(prediction) => {
            debug!(label = %prediction.label, confidence = prediction.confidence, "classified upload");
            Html(page::with_result(
                has_example,
                &prediction.top_k(page::TOP_CLASSES),
            ))
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, "prediction failed");
            (
                status_for(&e),
                Html(page::with_error(has_example, &e.to_string())),
            )
                .into_response()
        }
    }
}

async fn api_predict(State(state): State<AppState>, body: Bytes) -> Response {
    match run_predict(&state, body.to_vec()).await {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e) => error_json(&e),
    }
}

async fn api_predict_example(State(state): State<AppState>) -> Response {
    let Some(path) = state.example_image.clone() else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "no example image configured"})),
        )
            .into_response();
    };
    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "example image unreadable");
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "example image unreadable"})),
            )
                .into_response();
        }
    };
    match run_predict(&state, bytes).await {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e) => error_json(&e),
    }
}

async fn example_image(State(state): State<AppState>) -> Response {
    match state.example_image.as_deref() {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => {
                ([(header::CONTENT_TYPE, content_type_for(path))], bytes).into_response()
            }
            Err(_) => StatusCode::NOT_FOUND.into_response(),
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("png") => "image/png",
        Some(e) if e.eq_ignore_ascii_case("gif") => "image/gif",
        Some(e) if e.eq_ignore_ascii_case("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({"live": true}))
}

async fn ready() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ready": READY.load(Ordering::SeqCst)}))
}

/// Inference is synchronous (tract); keep it off the async workers.
async fn run_predict(state: &AppState, bytes: Vec<u8>) -> Result<Prediction, ClassifierError> {
    let classifier = state.classifier.clone();
    tokio::task::spawn_blocking(move || classifier.predict_bytes(&bytes))
        .await
        .map_err(|e| ClassifierError::Inference(e.to_string()))?
}

fn error_json(e: &ClassifierError) -> Response {
    (
        status_for(e),
        Json(serde_json::json!({"error": e.to_string()})),
    )
        .into_response()
}

fn status_for(e: &ClassifierError) -> StatusCode {
    match e {
        ClassifierError::Decode(_) | ClassifierError::Input { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;

    async fn multipart_from(body: &str) -> Multipart {
        let req = axum::http::Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=XBOUND",
            )
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    #[tokio::test]
    async fn upload_without_image_field_is_missing() {
        let body = "--XBOUND\r\n\
             Content-Disposition: form-data; name=\"other\"; filename=\"x.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             not the right field\r\n\
             --XBOUND--\r\n";
        assert!(matches!(
            image_field(multipart_from(body).await).await,
            UploadField::Missing
        ));
    }

    #[tokio::test]
    async fn image_field_bytes_are_extracted() {
        let body = "--XBOUND\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"bear.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             fake jpeg bytes\r\n\
             --XBOUND--\r\n";
        match image_field(multipart_from(body).await).await {
            UploadField::Image(b) => assert_eq!(&b[..], b"fake jpeg bytes"),
            _ => panic!("expected image bytes"),
        }
    }

    #[test]
    fn decode_failures_map_to_422() {
        let err = bear_classifier::preprocess::tensor_from_bytes(b"junk", 224, 224).unwrap_err();
        assert_eq!(status_for(&err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn engine_failures_map_to_500() {
        let err = ClassifierError::Inference("boom".into());
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn mark_ready_flips_the_probe() {
        mark_ready();
        assert!(READY.load(Ordering::SeqCst));
    }

    #[test]
    fn example_content_type_follows_extension() {
        use std::path::Path;
        assert_eq!(content_type_for(Path::new("assets/grizzly.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("assets/bear.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("assets/bear.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("assets/noext")), "image/jpeg");
    }
}
