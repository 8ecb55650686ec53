//! HTTP front end guarded by admission control.

mod server;
mod service;

pub use server::HttpServer;
pub use service::{admission, router, with_admission};
