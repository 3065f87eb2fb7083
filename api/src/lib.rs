//! SqlSage API Module
//!
//! HTTP front end over the shared query pipeline. One POST endpoint
//! runs the full question-to-explanation flow; a health endpoint
//! reports service readiness.

pub mod handlers;
pub mod models;
pub mod server;

pub use handlers::*;
pub use models::*;
pub use server::*;
