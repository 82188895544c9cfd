pub mod auth;
pub mod health;
pub mod media;
pub mod metrics;
pub mod posts;
pub mod social;
pub mod stories;
pub mod users;
