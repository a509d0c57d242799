//! Integration tests for the detection API client
//!
//! Runs the client against a wiremock server standing in for the backend.

use std::io::Cursor;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use solar_detect_lib::api::types::{LoginRequest, ProfileUpdateRequest, RegisterRequest, UserType};
use solar_detect_lib::auth::{MemoryStore, SessionManager};
use solar_detect_lib::validation::Coordinates;
use solar_detect_lib::{
    Config, MaskDetector, MaskParams, MaskVerdict, Prediction, SolarDetectClient,
    SolarDetectError,
};

// ============================================================================
// Helpers
// ============================================================================

/// Non-default timeouts give every test its own reqwest client, so pooled
/// connections never outlive a test runtime.
fn config_for(server: &MockServer) -> Config {
    Config {
        api_url: server.uri(),
        timeout: Duration::from_secs(10),
        predict_timeout: Duration::from_secs(20),
        ..Config::default()
    }
}

fn client_for(server: &MockServer) -> SolarDetectClient {
    SolarDetectClient::new(config_for(server)).unwrap()
}

fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn profile_json() -> serde_json::Value {
    json!({
        "id": 7,
        "email": "ana@example.com",
        "name": "Ana",
        "userType": "STUDENT",
        "documentNumber": "52998224725",
        "phone": "11987654321",
        "address": null,
        "quota": {
            "remainingRequests": 2,
            "totalQuota": 3,
            "lastResetTime": "2026-10-18T10:00:00",
            "minutesUntilReset": 4
        }
    })
}

fn sao_paulo() -> Coordinates {
    Coordinates::new(-23.55052, -46.633308).unwrap()
}

// ============================================================================
// Auth
// ============================================================================

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_login_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({
                "email": "ana@example.com",
                "password": "secret1",
                "userType": "STUDENT"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "tok-123",
                "type": "Bearer",
                "email": "ana@example.com",
                "name": "Ana",
                "userType": "STUDENT",
                "userId": 7
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .login(&LoginRequest {
                email: "ana@example.com".to_string(),
                password: "secret1".to_string(),
                user_type: UserType::Student,
            })
            .await
            .unwrap();

        assert_eq!(response.token, "tok-123");
        assert_eq!(response.user_type, UserType::Student);
        assert_eq!(response.user_id, Some(7));
    }

    #[tokio::test]
    async fn test_login_then_session_is_stored() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "opaque-token",
                "userType": "COMPANY"
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .login(&LoginRequest {
                email: "corp@example.com".to_string(),
                password: "secret1".to_string(),
                user_type: UserType::Company,
            })
            .await
            .unwrap();
        assert_eq!(response.token_type, "Bearer");

        let sessions = SessionManager::new(MemoryStore::new());
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let session = sessions.set_auth(&response, now).unwrap();

        // Opaque tokens fall back to a 24 hour session
        assert_eq!(session.expires_at, now + chrono::Duration::hours(24));
        assert_eq!(sessions.user_type().unwrap(), Some(UserType::Company));
        assert_eq!(sessions.require_token(now).unwrap(), "opaque-token");
    }

    #[tokio::test]
    async fn test_bad_credentials_surface_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .login(&LoginRequest {
                email: "ana@example.com".to_string(),
                password: "wrong-pass".to_string(),
                user_type: UserType::Student,
            })
            .await
            .unwrap_err();

        match err {
            SolarDetectError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_routes_by_user_type() {
        let server = MockServer::start().await;

        for (route, user_type) in [("student", "STUDENT"), ("company", "COMPANY")] {
            Mock::given(method("POST"))
                .and(path(format!("/api/auth/register/{}", route)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "token": format!("tok-{}", route),
                    "userType": user_type
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        let student = client
            .register(&RegisterRequest {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                password: "secret1".to_string(),
                document_number: "52998224725".to_string(),
                phone: None,
                address: None,
                user_type: UserType::Student,
            })
            .await
            .unwrap();
        assert_eq!(student.token, "tok-student");

        let company = client
            .register(&RegisterRequest {
                name: "Solar Ltda".to_string(),
                email: "corp@example.com".to_string(),
                password: "secret1".to_string(),
                document_number: "11444777000161".to_string(),
                phone: Some("1133334444".to_string()),
                address: Some("Av. Paulista, 1000".to_string()),
                user_type: UserType::Company,
            })
            .await
            .unwrap();
        assert_eq!(company.token, "tok-company");
        assert_eq!(company.user_type, UserType::Company);
    }
}

// ============================================================================
// Profile
// ============================================================================

mod profile {
    use super::*;

    #[tokio::test]
    async fn test_profile_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/profile"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server)
            .with_token("tok-123")
            .profile()
            .await
            .unwrap();

        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.user_type, UserType::Student);
        assert_eq!(profile.quota.remaining_requests, 2);
        assert!(!profile.quota.is_exhausted());
    }

    #[tokio::test]
    async fn test_profile_without_token_skips_network() {
        let server = MockServer::start().await;

        let err = client_for(&server).profile().await.unwrap_err();
        assert!(matches!(err, SolarDetectError::NotAuthenticated));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/profile"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .with_token("stale")
            .profile()
            .await
            .unwrap_err();
        assert!(matches!(err, SolarDetectError::Unauthorized));
    }

    #[tokio::test]
    async fn test_update_profile_sends_only_changed_fields() {
        let server = MockServer::start().await;

        let mut updated = profile_json();
        updated["name"] = json!("Ana Maria");

        Mock::given(method("PUT"))
            .and(path("/api/user/profile"))
            .and(body_json(json!({ "name": "Ana Maria" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(updated))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server)
            .with_token("tok-123")
            .update_profile(&ProfileUpdateRequest {
                name: Some("Ana Maria".to_string()),
                ..ProfileUpdateRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(profile.name, "Ana Maria");
    }

    #[tokio::test]
    async fn test_delete_account_wrong_password() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/auth/delete"))
            .and(body_json(json!({ "currentPassword": "nope" })))
            .respond_with(ResponseTemplate::new(403).set_body_string("Senha incorreta"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .with_token("tok-123")
            .delete_account("nope")
            .await
            .unwrap_err();

        match err {
            SolarDetectError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Senha incorreta");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

// ============================================================================
// Prediction
// ============================================================================

mod prediction {
    use super::*;

    #[tokio::test]
    async fn test_image_response_with_overlay_is_present() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .and(query_param("lat", "-23.550520"))
            .and(query_param("lon", "-46.633308"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(png(64, 64, [255, 0, 255]), "image/png"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_token("tok-123");
        let mut detector = MaskDetector::new(MaskParams::default());
        let (prediction, verdict) = client.detect_at(&sao_paulo(), &mut detector).await.unwrap();

        assert!(matches!(prediction, Prediction::Image { .. }));
        assert_eq!(prediction.file_extension(), Some("png"));
        assert_eq!(verdict, MaskVerdict::Present);
        assert!(detector.has_bitmap());
    }

    #[tokio::test]
    async fn test_image_without_overlay_is_absent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(png(64, 64, [40, 120, 40]), "image/png"),
            )
            .mount(&server)
            .await;

        let mut detector = MaskDetector::new(MaskParams::default());
        let (_, verdict) = client_for(&server)
            .detect_at(&sao_paulo(), &mut detector)
            .await
            .unwrap();
        assert_eq!(verdict, MaskVerdict::Absent);
    }

    #[tokio::test]
    async fn test_corrupt_image_is_unknown() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"not a png".to_vec(), "image/png"),
            )
            .mount(&server)
            .await;

        let mut detector = MaskDetector::new(MaskParams::default());
        let (prediction, verdict) = client_for(&server)
            .detect_at(&sao_paulo(), &mut detector)
            .await
            .unwrap();
        assert!(matches!(prediction, Prediction::Image { .. }));
        assert_eq!(verdict, MaskVerdict::Unknown);
        assert!(!detector.has_bitmap());
    }

    #[tokio::test]
    async fn test_json_response_yields_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "url": "https://cdn.example.com/p/1.png" })),
            )
            .mount(&server)
            .await;

        let mut detector = MaskDetector::new(MaskParams::default());
        let (prediction, verdict) = client_for(&server)
            .detect_at(&sao_paulo(), &mut detector)
            .await
            .unwrap();

        assert_eq!(
            prediction,
            Prediction::ImageUrl("https://cdn.example.com/p/1.png".to_string())
        );
        assert_eq!(verdict, MaskVerdict::Unknown);
    }

    #[tokio::test]
    async fn test_json_without_url_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .mount(&server)
            .await;

        let err = client_for(&server).predict(&sao_paulo()).await.unwrap_err();
        assert!(matches!(err, SolarDetectError::MissingImageUrl));
    }

    #[tokio::test]
    async fn test_unexpected_content_type() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(250)))
            .mount(&server)
            .await;

        let err = client_for(&server).predict(&sao_paulo()).await.unwrap_err();
        match err {
            SolarDetectError::UnexpectedContent(preview) => assert_eq!(preview.len(), 100),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_quota_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({ "error": "Limite de requisições atingido" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .with_token("tok-123")
            .predict(&sao_paulo())
            .await
            .unwrap_err();
        match err {
            SolarDetectError::QuotaExceeded(message) => {
                assert_eq!(message, "Limite de requisições atingido")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_quota_rejection_as_bad_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "erro": "Request quota exceeded. Please wait until the quota resets."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .with_token("tok-123")
            .predict(&sao_paulo())
            .await
            .unwrap_err();
        match err {
            SolarDetectError::QuotaExceeded(message) => assert_eq!(
                message,
                "Request quota exceeded. Please wait until the quota resets."
            ),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_runtime_error_keeps_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "erro": "Model unavailable" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).predict(&sao_paulo()).await.unwrap_err();
        match err {
            SolarDetectError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Model unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_endpoint_sends_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/predict/detect"))
            .and(header("authorization", "Bearer tok-123"))
            .and(body_json(json!({ "lat": 1.5, "lon": -2.25 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "image_url": "https://x/y.png" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let prediction = client_for(&server)
            .with_token("tok-123")
            .predict_post(&Coordinates::new(1.5, -2.25).unwrap())
            .await
            .unwrap();
        assert_eq!(prediction, Prediction::ImageUrl("https://x/y.png".to_string()));
    }

    #[tokio::test]
    async fn test_post_url_response_releases_bitmap() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/predict/detect"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(png(64, 64, [255, 0, 255]), "image/png"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/predict/detect"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": "https://x/z.png" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).with_token("tok-123");
        let mut detector = MaskDetector::new(MaskParams::default());

        let (_, verdict) = client
            .detect_at_post(&sao_paulo(), &mut detector)
            .await
            .unwrap();
        assert_eq!(verdict, MaskVerdict::Present);
        assert!(detector.has_bitmap());

        let (prediction, verdict) = client
            .detect_at_post(&sao_paulo(), &mut detector)
            .await
            .unwrap();
        assert_eq!(prediction, Prediction::ImageUrl("https://x/z.png".to_string()));
        assert_eq!(verdict, MaskVerdict::Unknown);
        assert!(!detector.has_bitmap());
    }

    #[tokio::test]
    async fn test_server_error_uses_body_text() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/predict"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model offline"))
            .mount(&server)
            .await;

        let err = client_for(&server).predict(&sao_paulo()).await.unwrap_err();
        match err {
            SolarDetectError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model offline");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
