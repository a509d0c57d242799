use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use super::http_client::{api_client, build_client, predict_client};
use super::types::{
    image_url_from_json, ApiErrorBody, AuthResponse, DeleteAccountRequest, DetectRequest,
    LoginRequest, ProfileUpdateRequest, RegisterRequest, UserProfile, UserType,
};
use crate::config::Config;
use crate::detection::{MaskDetector, MaskVerdict};
use crate::error::{Result, SolarDetectError};
use crate::validation::Coordinates;

/// Longest slice of an unexpected body kept for the error message.
const UNEXPECTED_BODY_PREVIEW: usize = 100;

/// Start of the server's message for an exhausted request quota.
const QUOTA_EXCEEDED_PREFIX: &str = "Request quota exceeded";

/// What the prediction endpoint returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// The rendered image itself
    Image { bytes: Vec<u8>, content_type: String },
    /// A link to the rendered image
    ImageUrl(String),
}

impl Prediction {
    /// File extension matching the image content type, e.g. "png".
    pub fn file_extension(&self) -> Option<&'static str> {
        match self {
            Self::Image { content_type, .. } => {
                let essence = content_type.split(';').next().unwrap_or("").trim();
                let subtype = essence.split('/').nth(1).unwrap_or("");
                let exts = mime_guess::get_mime_extensions_str(essence)?;
                exts.iter()
                    .find(|ext| **ext == subtype)
                    .or_else(|| exts.first())
                    .copied()
            }
            Self::ImageUrl(_) => None,
        }
    }
}

/// Client for the solar detection API
pub struct SolarDetectClient {
    config: Config,
    client: Client,
    predict: Client,
    token: Option<String>,
}

impl SolarDetectClient {
    pub fn new(config: Config) -> Result<Self> {
        let defaults = Config::default();
        let client = if config.timeout == defaults.timeout {
            api_client().clone()
        } else {
            build_client(config.timeout)?
        };
        let predict = if config.predict_timeout == defaults.predict_timeout {
            predict_client().clone()
        } else {
            build_client(config.predict_timeout)?
        };

        Ok(Self {
            config,
            client,
            predict,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn bearer(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or(SolarDetectError::NotAuthenticated)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Log in. The returned token is not stored on the client.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let url = self.config.endpoint("/api/auth/login");
        info!(email = %request.email, user_type = %request.user_type, "Logging in");

        let response = self.client.post(&url).json(request).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Register a new account on the endpoint for its user type.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let path = match request.user_type {
            UserType::Student => "/api/auth/register/student",
            UserType::Company => "/api/auth/register/company",
        };
        let url = self.config.endpoint(path);
        info!(email = %request.email, user_type = %request.user_type, "Registering account");

        let response = self.client.post(&url).json(request).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    pub async fn profile(&self) -> Result<UserProfile> {
        let token = self.bearer()?;
        let url = self.config.endpoint("/api/user/profile");
        debug!("Fetching profile");

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    pub async fn update_profile(&self, request: &ProfileUpdateRequest) -> Result<UserProfile> {
        let token = self.bearer()?;
        let url = self.config.endpoint("/api/user/profile");
        debug!("Updating profile");

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Delete the account after confirming the current password. Returns the
    /// server's confirmation text.
    pub async fn delete_account(&self, current_password: &str) -> Result<String> {
        let token = self.bearer()?;
        let url = self.config.endpoint("/api/auth/delete");
        let body = DeleteAccountRequest {
            current_password: current_password.to_string(),
        };
        warn!("Deleting account");

        let response = self
            .client
            .delete(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        // The server answers a wrong password with 403 and a plain text body
        if response.status() == StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            return Err(SolarDetectError::Api {
                status: 403,
                message: text,
            });
        }

        let response = check_status(response).await?;
        Ok(response.text().await?)
    }

    /// `GET /api/predict?lat=..&lon=..`
    pub async fn predict(&self, coords: &Coordinates) -> Result<Prediction> {
        let url = self.config.endpoint("/api/predict");
        info!(lat = coords.lat, lon = coords.lon, "Requesting prediction");

        let request = self.predict.get(&url).query(&coords.query_pairs());
        let response = self.authorize(request).send().await?;
        read_prediction(response).await
    }

    /// `POST /api/predict/detect` with a JSON body.
    pub async fn predict_post(&self, coords: &Coordinates) -> Result<Prediction> {
        let url = self.config.endpoint("/api/predict/detect");
        info!(lat = coords.lat, lon = coords.lon, "Requesting prediction (POST)");

        let body = DetectRequest {
            lat: coords.lat,
            lon: coords.lon,
        };
        let request = self.predict.post(&url).json(&body);
        let response = self.authorize(request).send().await?;
        read_prediction(response).await
    }

    /// Predict, then run the mask detector on the returned image.
    ///
    /// A URL response is never fetched, so its verdict is `Unknown`.
    pub async fn detect_at(
        &self,
        coords: &Coordinates,
        detector: &mut MaskDetector,
    ) -> Result<(Prediction, MaskVerdict)> {
        let prediction = self.predict(coords).await?;
        Ok(analyse(prediction, detector).await)
    }

    /// [`detect_at`](Self::detect_at) over the POST endpoint.
    pub async fn detect_at_post(
        &self,
        coords: &Coordinates,
        detector: &mut MaskDetector,
    ) -> Result<(Prediction, MaskVerdict)> {
        let prediction = self.predict_post(coords).await?;
        Ok(analyse(prediction, detector).await)
    }
}

async fn analyse(
    prediction: Prediction,
    detector: &mut MaskDetector,
) -> (Prediction, MaskVerdict) {
    let verdict = match &prediction {
        Prediction::Image { bytes, .. } => detector.detect(bytes.clone()).await,
        Prediction::ImageUrl(_) => {
            detector.release();
            MaskVerdict::Unknown
        }
    };
    info!(%verdict, "Prediction analysed");
    (prediction, verdict)
}

/// Map non-success statuses to errors, passing successful responses through.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text
            }
        });

    warn!(status = status.as_u16(), %message, "API request failed");
    Err(match status {
        StatusCode::UNAUTHORIZED => SolarDetectError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => SolarDetectError::QuotaExceeded(message),
        // The server reports an exhausted quota as a plain 400
        StatusCode::BAD_REQUEST if message.starts_with(QUOTA_EXCEEDED_PREFIX) => {
            SolarDetectError::QuotaExceeded(message)
        }
        _ => SolarDetectError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

async fn read_prediction(response: Response) -> Result<Prediction> {
    let response = check_status(response).await?;
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.contains("image") {
        let bytes = response.bytes().await?.to_vec();
        debug!(size = bytes.len(), %content_type, "Received prediction image");
        return Ok(Prediction::Image {
            bytes,
            content_type,
        });
    }

    if content_type.contains("application/json") {
        let body: serde_json::Value = response.json().await?;
        return image_url_from_json(&body)
            .map(Prediction::ImageUrl)
            .ok_or(SolarDetectError::MissingImageUrl);
    }

    let text = response.text().await.unwrap_or_default();
    let preview: String = text.chars().take(UNEXPECTED_BODY_PREVIEW).collect();
    Err(SolarDetectError::UnexpectedContent(preview))
}
