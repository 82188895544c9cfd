pub mod handlers;
pub mod models;
pub mod otp;
mod plugin;
pub mod repo;

pub use plugin::UsersPlugin;
