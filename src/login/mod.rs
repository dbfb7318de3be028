pub mod claims;
pub mod handlers;
mod oidc;
pub mod pages;
mod session;

pub use claims::{IdTokenClaims, UserProfile};
pub use oidc::{DiscoveryDocument, OidcClient, ProviderProfile, TokenResponse};
pub use session::{Session, SessionStore, TokenSet, SESSION_COOKIE};
