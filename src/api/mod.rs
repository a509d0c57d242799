//! HTTP access to the detection API
//!
//! Covers login and registration, the profile/quota endpoints, and the
//! coordinate prediction endpoints that return the rendered detection image.

pub mod client;
pub mod http_client;
pub mod types;

pub use client::{Prediction, SolarDetectClient};
pub use types::{
    AuthResponse, LoginRequest, ProfileUpdateRequest, QuotaInfo, RegisterRequest, UserProfile,
    UserType,
};
