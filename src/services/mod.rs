pub mod client;
pub mod oauth;
pub mod user;

pub use client::ClientService;
pub use oauth::{OAuthService, TokenIntrospection};
pub use user::UserService;
