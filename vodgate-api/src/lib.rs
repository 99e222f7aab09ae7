// vodgate API Library
//
// HTTP surface of the aggregation gateway

pub mod http;

// Re-export commonly used types
pub use http::{create_router, AppState};
