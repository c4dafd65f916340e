pub mod document;
pub mod task;
pub mod project;
pub mod client;
pub mod config;

pub use document::*;
pub use task::*;
pub use project::*;
pub use client::*;
pub use config::*;
