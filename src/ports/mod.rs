pub mod auth;
pub mod catalog;
pub mod clock;
pub mod store;
