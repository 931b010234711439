pub mod auth;
pub mod bikes;
pub mod ratings;
pub mod reviews;
