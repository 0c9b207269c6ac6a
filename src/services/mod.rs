pub mod downloader;
pub mod heap_options;
pub mod installer;
pub mod java_opts;

pub use heap_options::{build_heap_options, MemoryLimit};
pub use installer::{provision, Installation, Provisioned};
pub use java_opts::java_options;
