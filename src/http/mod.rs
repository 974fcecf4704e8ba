//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! client connection
//!     → server.rs (Axum router, middleware stack)
//!     → request.rs (request ID assigned and propagated)
//!     → handlers.rs (validate, derive dedup key, run through admission)
//!     → response.rs (admission errors → status codes + JSON error body)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer};
