pub mod clock;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod plugin;
pub mod repo;
pub mod store;

pub use clock::{Clock, DynClock, ManualClock, SystemClock};
pub use error::StoryError;
pub use lifecycle::StoryLifecycle;
pub use memory::InMemoryStoryStore;
pub use plugin::StoriesPlugin;
pub use repo::PgStoryStore;
pub use store::{DynStoryStore, StoryStore, SweepScope};
