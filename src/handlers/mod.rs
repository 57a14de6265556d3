pub mod clients;
pub mod oauth;
pub mod users;
