pub mod handlers;
pub mod plugin;
pub mod store;

pub use plugin::MediaPlugin;
pub use store::{DynMediaStore, InMemoryMediaStore, LocalMediaStore, MediaStore};
