//! Configuration sections of `tikzsvg.toml`.

mod store;
mod tex;
mod worker;

pub use store::StoreConfig;
pub use tex::TexConfig;
pub use worker::WorkerConfig;
