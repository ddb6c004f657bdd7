pub mod engine;
pub mod error;
pub mod file_store;
pub mod lister;
pub mod page;
pub mod server;
pub mod store;

pub use engine::Engine;
pub use error::{ListerError, ListerResult};
pub use file_store::FileStore;
pub use lister::ContentLister;
pub use page::{PageComposer, RenderedPage};
pub use server::Server;
pub use store::{ContentStore, MemoryStore};
