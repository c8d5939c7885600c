use actix_web::{HttpResponse, web};
use log::{error, info};
use thiserror::Error;

use shared::{LivenessProbabilities, LivenessRequest, LivenessResponse, ModelStatusResponse};

use crate::decode;
use crate::error::{DecodeError, InferenceError};
use crate::model::Prediction;
use crate::model::manager::{ModelManager, ModelStatus};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/predict").route(web::post().to(predict_liveness)))
        .service(web::resource("/api/model/status").route(web::get().to(model_status)));
}

#[derive(Debug, Error)]
enum PredictError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Application-level failures never tear down the channel: every outcome is
/// a well-formed 200 response with a success flag. Only malformed JSON
/// bodies surface as HTTP errors.
async fn predict_liveness(
    manager: web::Data<ModelManager>,
    request: web::Json<LivenessRequest>,
) -> HttpResponse {
    let response = match run_prediction(&manager, &request) {
        Ok(prediction) => {
            info!(
                "Prediction completed: is_live={}, confidence={:.3}",
                prediction.is_live, prediction.confidence
            );
            success_response(prediction, manager.live_class_index())
        }
        Err(err) => {
            error!("Prediction failed: {}", err);
            LivenessResponse::failure(err.to_string())
        }
    };
    HttpResponse::Ok().json(response)
}

fn run_prediction(
    manager: &ModelManager,
    request: &LivenessRequest,
) -> Result<Prediction, PredictError> {
    let image = decode::decode_image(&request.image_data, &request.image_format)?;
    Ok(manager.classify(&image)?)
}

fn success_response(prediction: Prediction, live_index: usize) -> LivenessResponse {
    let (fake, live) = prediction.two_class_split(live_index);
    LivenessResponse {
        is_live: prediction.is_live,
        confidence: prediction.confidence,
        predicted_class: prediction.label,
        probabilities: LivenessProbabilities { fake, live },
        success: true,
        error_message: String::new(),
    }
}

async fn model_status(manager: web::Data<ModelManager>) -> HttpResponse {
    HttpResponse::Ok().json(status_response(manager.status()))
}

fn status_response(status: ModelStatus) -> ModelStatusResponse {
    ModelStatusResponse {
        status: if status.loaded { "loaded" } else { "not_loaded" }.to_string(),
        model_name: status.name,
        model_type: status.model_type,
        local_path: status.local_path,
        is_loaded: status.loaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSettings;
    use crate::error::LoadError;
    use crate::model::{Classifier, ClassifierProvider, LabelSet, LoadedClassifier};
    use actix_web::{App, test};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use image::DynamicImage;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    struct FixedClassifier(Vec<f32>);

    impl Classifier for FixedClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    struct FakeProvider(Vec<f32>);

    impl ClassifierProvider for FakeProvider {
        fn is_cached(&self, _dir: &Path) -> bool {
            true
        }

        fn fetch(&self, _source: &str, _dest: &Path) -> Result<(), LoadError> {
            Ok(())
        }

        fn load(&self, _dir: &Path) -> Result<LoadedClassifier, LoadError> {
            Ok(LoadedClassifier {
                classifier: Box::new(FixedClassifier(self.0.clone())),
                labels: LabelSet::new(vec!["fake".into(), "live".into()]),
                model_type: "Dinov2ForImageClassification".into(),
            })
        }
    }

    fn manager(probs: Vec<f32>, loaded: bool) -> web::Data<ModelManager> {
        let manager = ModelManager::new(
            ModelSettings {
                source: "acme/liveness-test".into(),
                cache_dir: PathBuf::from("/nonexistent/cache"),
                live_class_index: 1,
            },
            Box::new(FakeProvider(probs)),
        );
        if loaded {
            manager.ensure_loaded().unwrap();
        }
        web::Data::new(manager)
    }

    fn jpeg_payload() -> String {
        let img = image::RgbImage::from_pixel(32, 32, image::Rgb([200, 160, 120]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Jpeg)
            .unwrap();
        STANDARD.encode(buf.into_inner())
    }

    #[actix_web::test]
    async fn valid_jpeg_with_uppercase_format_succeeds() {
        let app = test::init_service(
            App::new()
                .app_data(manager(vec![0.1, 0.9], true))
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(LivenessRequest {
                image_data: jpeg_payload(),
                image_format: "JPG".into(),
            })
            .to_request();
        let response: LivenessResponse = test::call_and_read_body_json(&app, request).await;

        assert!(response.success);
        assert!(response.is_live);
        assert_eq!(response.predicted_class, "live");
        assert!((response.confidence - 0.9).abs() < 1e-5);
        let sum = response.probabilities.fake + response.probabilities.live;
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[actix_web::test]
    async fn corrupted_bytes_yield_flagged_failure() {
        let app = test::init_service(
            App::new()
                .app_data(manager(vec![0.1, 0.9], true))
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(LivenessRequest {
                image_data: STANDARD.encode(b"definitely not an image"),
                image_format: "jpeg".into(),
            })
            .to_request();
        let response: LivenessResponse = test::call_and_read_body_json(&app, request).await;

        assert!(!response.success);
        assert_eq!(response.predicted_class, "error");
        assert_eq!(response.confidence, 0.0);
        assert!(!response.is_live);
        assert!(!response.error_message.is_empty());
    }

    #[actix_web::test]
    async fn unready_model_yields_flagged_failure() {
        let app = test::init_service(
            App::new()
                .app_data(manager(vec![0.1, 0.9], false))
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(LivenessRequest {
                image_data: jpeg_payload(),
                image_format: "jpeg".into(),
            })
            .to_request();
        let response: LivenessResponse = test::call_and_read_body_json(&app, request).await;

        assert!(!response.success);
        assert!(response.error_message.contains("not loaded"));
    }

    #[actix_web::test]
    async fn status_tracks_model_lifecycle() {
        let unloaded = test::init_service(
            App::new()
                .app_data(manager(vec![0.1, 0.9], false))
                .configure(configure_routes),
        )
        .await;
        let request = test::TestRequest::get()
            .uri("/api/model/status")
            .to_request();
        let response: ModelStatusResponse = test::call_and_read_body_json(&unloaded, request).await;
        assert!(!response.is_loaded);
        assert_eq!(response.status, "not_loaded");

        let loaded = test::init_service(
            App::new()
                .app_data(manager(vec![0.1, 0.9], true))
                .configure(configure_routes),
        )
        .await;
        let request = test::TestRequest::get()
            .uri("/api/model/status")
            .to_request();
        let response: ModelStatusResponse = test::call_and_read_body_json(&loaded, request).await;
        assert!(response.is_loaded);
        assert_eq!(response.status, "loaded");
        assert_eq!(response.model_name, "acme/liveness-test");
        assert!(!response.model_type.is_empty());
    }

    #[actix_web::test]
    async fn fake_prediction_is_not_live() {
        let app = test::init_service(
            App::new()
                .app_data(manager(vec![0.8, 0.2], true))
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(LivenessRequest {
                image_data: jpeg_payload(),
                image_format: "png".into(),
            })
            .to_request();
        let response: LivenessResponse = test::call_and_read_body_json(&app, request).await;

        assert!(response.success);
        assert!(!response.is_live);
        assert_eq!(response.predicted_class, "fake");
        assert!((response.probabilities.fake - 0.8).abs() < 1e-5);
    }
}
