//! HTTP API handlers for echotag-ed

pub mod analyze;
pub mod batch;
pub mod health;
pub mod sse;
pub mod status;

pub use analyze::analyze_routes;
pub use batch::batch_routes;
pub use health::health_routes;
pub use sse::event_stream;
pub use status::status_routes;
