//! Services layer for auth-service.
//!
//! The orchestrator (`AuthService`) and the collaborators it is built from:
//! token signing, activation email and the user/session stores.

mod auth;
mod database;
mod email;
pub mod error;
mod jwt;
mod memory;
mod store;

pub use auth::AuthService;
pub use database::Database;
pub use email::{activation_bodies, EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use jwt::{JwtService, TokenClaims, TokenPair};
pub use memory::InMemoryStore;
pub use store::{CredentialStore, SessionStore};
