pub mod handlers;
pub mod models;
pub mod plugin;
pub mod repo;

pub use plugin::PostsPlugin;

#[cfg(test)]
mod tests;
