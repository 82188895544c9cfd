pub mod handlers;
pub mod models;
pub mod plugin;
pub mod middleware;
pub mod repo;
pub mod session;
pub mod token;

pub use handlers::AuthUser;
pub use plugin::AuthPlugin;
pub use session::Revocations;
