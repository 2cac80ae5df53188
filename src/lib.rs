pub mod binder;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod index;
pub mod page;
pub mod render;
pub mod server;
pub mod session;
pub mod summary;
pub mod types;
