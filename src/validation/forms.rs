//! Whole-form validation for login, registration and profile updates.
//!
//! Each form collects every failing field instead of stopping at the first,
//! so a caller can show all problems at once.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::document::{is_valid_document, DocumentKind};
use super::{clean_number, is_valid_phone};
use crate::api::types::{LoginRequest, ProfileUpdateRequest, RegisterRequest, UserType};
use crate::error::{Result, SolarDetectError};

const MIN_PASSWORD_LENGTH: usize = 6;
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 150;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if email.trim().is_empty() {
        errors.push(FieldError::new("email", "email is required"));
    } else if !is_valid_email(email) {
        errors.push(FieldError::new("email", "invalid email"));
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            "password",
            "password must be at least 6 characters",
        ));
    }
}

fn check_phone(phone: Option<&str>, errors: &mut Vec<FieldError>) {
    if let Some(phone) = phone.filter(|p| !p.trim().is_empty()) {
        if !is_valid_phone(phone) {
            errors.push(FieldError::new("phone", "phone must have 10 or 11 digits"));
        }
    }
}

fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SolarDetectError::Validation(errors))
    }
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

impl LoginForm {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        finish(errors)
    }

    pub fn into_request(self) -> Result<LoginRequest> {
        self.validate()?;
        Ok(LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password,
            user_type: self.user_type,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub document_number: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub user_type: UserType,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        let name_len = self.name.trim().chars().count();
        if name_len == 0 {
            errors.push(FieldError::new("name", "name is required"));
        } else if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name_len) {
            errors.push(FieldError::new(
                "name",
                "name must be between 2 and 150 characters",
            ));
        }

        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);

        let kind = DocumentKind::for_user_type(self.user_type);
        if clean_number(&self.document_number).is_empty() {
            errors.push(FieldError::new("documentNumber", "document number is required"));
        } else if !is_valid_document(kind, &self.document_number) {
            errors.push(FieldError::new(
                "documentNumber",
                &format!("invalid {}", kind),
            ));
        }

        check_phone(self.phone.as_deref(), &mut errors);
        finish(errors)
    }

    /// Validate and build the wire request, with document and phone reduced
    /// to digits.
    pub fn into_request(self) -> Result<RegisterRequest> {
        self.validate()?;
        Ok(RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            document_number: clean_number(&self.document_number),
            phone: self
                .phone
                .filter(|p| !p.trim().is_empty())
                .map(|p| clean_number(&p)),
            address: self.address.filter(|a| !a.trim().is_empty()),
            user_type: self.user_type,
        })
    }
}

/// Profile edits. Absent fields are left unchanged server-side.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdateForm {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.address.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().chars().count() > MAX_NAME_LENGTH {
                errors.push(FieldError::new("name", "name must be at most 150 characters"));
            }
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !is_valid_email(email) {
                errors.push(FieldError::new("email", "invalid email"));
            }
        }
        check_phone(self.phone.as_deref(), &mut errors);
        finish(errors)
    }

    pub fn into_request(self) -> Result<ProfileUpdateRequest> {
        self.validate()?;
        Ok(ProfileUpdateRequest {
            name: self.name.filter(|n| !n.trim().is_empty()),
            email: self.email.filter(|e| !e.trim().is_empty()),
            phone: self.phone.map(|p| clean_number(&p)),
            address: self.address,
        })
    }
}
