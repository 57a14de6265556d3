pub mod authorization_code;
pub mod client;
pub mod token;
pub mod user;

pub use authorization_code::*;
pub use client::*;
pub use token::*;
pub use user::*;
