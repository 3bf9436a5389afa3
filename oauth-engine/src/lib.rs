//! # oauth-engine
//!
//! Token and grant state machine of an OAuth 2.0 authorization server.
//!
//! ## Components
//!
//! - **Clock:** Time source plus generation of ids, tokens and client secrets.
//! - **Store:** Persistence contract for consumers, credentials, users, codes and
//!   tokens, with an in-memory implementation.
//! - **Credentials:** Client provisioning, seeding and user registration.
//! - **Engine:** `authorize` and `token` endpoints with one handler per grant type.
//! - **Validator:** Bearer token authentication and introspection.
//!
//! HTTP transport is left to the embedding server.

pub mod clock;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod models;
pub mod pkce;
pub mod scope;
pub mod secret;
pub mod settings;
pub mod store;
pub mod validator;

pub use engine::{
    AuthorizeRejection, AuthorizeRequest, GrantEngine, GrantEngineBuilder, GrantHandler,
    IssuedToken, TokenRequest,
};
pub use error::{AuthError, ErrorCode, GrantError, ProvisionError, StoreError};
pub use settings::EngineSettings;
pub use store::{MemoryStore, Store};
pub use validator::{AuthContext, Introspection, TokenValidator};
