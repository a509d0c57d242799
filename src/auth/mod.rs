//! Authentication state on the client
//!
//! This module handles:
//! - Token expiry inspection (no signature verification)
//! - Session persistence through a pluggable token store
//! - Route guarding for pages that need a login

pub mod credentials;
pub mod session;
pub mod token;

pub use credentials::{FileStore, KeyringStore, MemoryStore, TokenStore};
pub use session::{ensure_user_type, requires_auth, RouteDecision, Session, SessionManager};
pub use token::{decode_claims, expires_at, is_near_expiration, TokenClaims};
