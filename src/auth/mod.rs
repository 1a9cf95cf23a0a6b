//! Authentication and session management

pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod service;
pub mod session;

pub use identity::IdentityRegistry;
pub use jwt::{Claims, SigningKeys, TokenCodec};
pub use middleware::{extract_token, require_auth, AuthLayer, AuthUser};
pub use models::{LoginRequest, Principal, TokenPair, UserType};
pub use service::AuthService;
pub use session::{MemorySessionStore, Session, SessionStore};
