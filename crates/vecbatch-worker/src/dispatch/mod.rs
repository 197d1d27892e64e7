mod fanout;
mod sync;

pub use fanout::FanOutDispatcher;
pub use sync::SyncDispatcher;
