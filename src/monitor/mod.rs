pub mod journal;
pub mod watcher;

pub use journal::{JournalSource, LogSource, LogStreams};
pub use watcher::Watcher;
