pub mod admin;
pub mod oauth;

pub use admin::*;
pub use oauth::*;
