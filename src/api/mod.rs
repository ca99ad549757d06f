// API module
//
// HTTP surface over a single in-memory ledger

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
