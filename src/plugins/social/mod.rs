pub mod graph;
pub mod handlers;
pub mod models;
pub mod plugin;
pub mod repo;

pub use graph::{DynFollowGraph, FollowGraph, InMemoryFollowGraph, PgFollowGraph};
pub use plugin::SocialPlugin;
