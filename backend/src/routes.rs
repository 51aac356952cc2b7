use std::sync::Arc;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use urlscan_inference::UrlScanner;

use crate::models::{
    ApiError, DebugFeaturesResponse, ErrorResponse, PingResponse, PredictResponse, UrlRequest,
};

const JSON_LIMIT: usize = 64 * 1024;

/// Register the API on an app or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(json_error),
    )
    .service(ping)
    .service(debug_features)
    .service(predict)
    .default_service(web::route().to(not_found));
}

/// Malformed bodies get the same `{"error": ...}` envelope, with a 400.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse::new(err.to_string()));
    InternalError::from_response(err, response).into()
}

async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(ErrorResponse::new("not found"))
}

#[get("/ping")]
pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(PingResponse { status: "ok" })
}

#[post("/debug_features")]
pub async fn debug_features(
    scanner: web::Data<Arc<UrlScanner>>,
    req: web::Json<UrlRequest>,
) -> Result<HttpResponse, ApiError> {
    let url = req.into_inner().url;
    let scanner = scanner.clone();
    let target = url.clone();

    let result = web::block(move || {
        let row = scanner.features(&target)?;
        Ok::<_, ApiError>(DebugFeaturesResponse {
            columns: row.columns().to_vec(),
            values: row.into_values(),
        })
    })
    .await;

    match result {
        Ok(Ok(features)) => {
            info!("debug features for {}: {} columns", url, features.columns.len());
            Ok(HttpResponse::Ok().json(features))
        }
        Ok(Err(e)) => {
            error!("feature extraction failed for {}: {}", url, e);
            Err(e)
        }
        Err(e) => {
            error!("blocking execution failed for {}: {}", url, e);
            Err(ApiError::Blocking(e.to_string()))
        }
    }
}

#[post("/predict")]
pub async fn predict(
    scanner: web::Data<Arc<UrlScanner>>,
    req: web::Json<UrlRequest>,
) -> Result<HttpResponse, ApiError> {
    let url = req.into_inner().url;
    let scanner = scanner.clone();
    let target = url.clone();

    match web::block(move || scanner.predict(&target)).await {
        Ok(Ok(prediction)) => {
            info!("prediction for {}: {}", url, prediction);
            Ok(HttpResponse::Ok().json(PredictResponse { url, prediction }))
        }
        Ok(Err(e)) => {
            error!("prediction failed for {}: {}", url, e);
            Err(e.into())
        }
        Err(e) => {
            error!("blocking execution failed for {}: {}", url, e);
            Err(ApiError::Blocking(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use urlscan_inference::{
        Artifacts, Classifier, FeatureResult, FeatureRow, FeatureSchema, InferenceError,
        LabelMap,
    };

    /// Uses the first column as the class index.
    struct FirstColumn;

    impl Classifier for FirstColumn {
        fn predict(&self, row: &FeatureRow<'_>) -> urlscan_inference::Result<i64> {
            Ok(row.values()[0] as i64)
        }
    }

    struct Failing;

    impl Classifier for Failing {
        fn predict(&self, _row: &FeatureRow<'_>) -> urlscan_inference::Result<i64> {
            Err(InferenceError::Inference("model exploded".into()))
        }
    }

    /// Features keyed on the URL so each test picks its own shape.
    fn builder(url: &str) -> urlscan_inference::Result<FeatureResult> {
        match url {
            "http://named.example" => Ok(FeatureResult::Named(HashMap::from([
                ("len_url".to_string(), 42.0),
                ("num_dots".to_string(), 3.0),
            ]))),
            "http://phish.example" => Ok(FeatureResult::Positional(vec![3.0, 1.0, 2.0])),
            "http://odd.example" => Ok(FeatureResult::Positional(vec![9.0, 0.0, 0.0])),
            "http://short.example" => Ok(FeatureResult::Positional(vec![1.0, 2.0])),
            "http://four.example" => Ok(FeatureResult::Positional(vec![1.0, 2.0, 3.0, 4.0])),
            _ => Err(InferenceError::FeatureBuilder("unreachable host".into())),
        }
    }

    fn scanner(classifier: Box<dyn Classifier>) -> web::Data<Arc<UrlScanner>> {
        scanner_with(&["len_url", "has_ip", "num_dots"], classifier)
    }

    fn scanner_with(
        columns: &[&str],
        classifier: Box<dyn Classifier>,
    ) -> web::Data<Arc<UrlScanner>> {
        let schema = FeatureSchema::new(columns.iter().map(|c| c.to_string()).collect()).unwrap();
        let artifacts = Artifacts::new(schema, classifier, LabelMap::default());
        web::Data::new(Arc::new(UrlScanner::new(artifacts, Box::new(builder))))
    }

    macro_rules! app {
        ($classifier:expr) => {
            test::init_service(
                App::new()
                    .app_data(scanner(Box::new($classifier)))
                    .configure(configure),
            )
            .await
        };
    }

    macro_rules! post {
        ($app:expr, $path:expr, $body:expr $(,)?) => {{
            let req = test::TestRequest::post()
                .uri($path)
                .set_json($body)
                .to_request();
            let resp = test::call_service(&$app, req).await;
            let status = resp.status();
            let body: Value = test::read_body_json(resp).await;
            (status, body)
        }};
    }

    #[actix_web::test]
    async fn ping_is_ok() {
        let app = app!(Failing);
        let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[actix_web::test]
    async fn debug_features_returns_aligned_row() {
        let app = app!(FirstColumn);
        let (status, body) = post!(app, "/debug_features", json!({"url": "http://named.example"}));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "columns": ["len_url", "has_ip", "num_dots"],
                "values": [42.0, 0.0, 3.0]
            })
        );
    }

    #[actix_web::test]
    async fn debug_features_reports_length_mismatch() {
        let app = app!(FirstColumn);
        let (status, body) = post!(app, "/debug_features", json!({"url": "http://short.example"}));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": "Feature length mismatch: expected 3, got 2"})
        );
    }

    #[actix_web::test]
    async fn predict_maps_label() {
        let app = app!(FirstColumn);
        let (status, body) = post!(app, "/predict", json!({"url": "http://phish.example"}));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"url": "http://phish.example", "prediction": "PHISHING"})
        );

        // missing has_ip is filled with 0, class 42 has no label
        let (_, body) = post!(app, "/predict", json!({"url": "http://named.example"}));
        assert_eq!(body["prediction"], json!(42));
    }

    #[actix_web::test]
    async fn predict_passes_unknown_class_through() {
        let app = app!(FirstColumn);
        let (status, body) = post!(app, "/predict", json!({"url": "http://odd.example"}));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"url": "http://odd.example", "prediction": 9}));
    }

    #[actix_web::test]
    async fn predict_failures_are_structured() {
        let app = app!(FirstColumn);
        let (status, body) = post!(app, "/predict", json!({"url": "http://down.example"}));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("unreachable host"));

        let app = app!(Failing);
        let (status, body) = post!(app, "/predict", json!({"url": "http://phish.example"}));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "inference: model exploded"}));
    }

    #[actix_web::test]
    async fn predict_reports_length_mismatch_without_predicting() {
        // Failing would surface "model exploded" if the classifier ran
        let app = test::init_service(
            App::new()
                .app_data(scanner_with(
                    &["len_url", "has_ip", "num_dots", "num_slashes", "entropy"],
                    Box::new(Failing),
                ))
                .configure(configure),
        )
        .await;
        let (status, body) = post!(app, "/predict", json!({"url": "http://four.example"}));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("expected 5, got 4"), "{message}");
    }

    #[actix_web::test]
    async fn malformed_body_is_bad_request() {
        let app = app!(FirstColumn);
        let (status, body) = post!(app, "/predict", json!({"link": "http://phish.example"}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn unknown_path_is_not_found() {
        let app = app!(FirstColumn);
        let resp = test::call_service(&app, test::TestRequest::get().uri("/nope").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "not found"}));
    }
}
