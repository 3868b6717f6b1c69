// ============ Search Core ============
pub mod airport;
pub mod fare;
pub mod renderer;

// ============ Triggers and Delivery ============
pub mod handler;
pub mod scheduled;
pub mod transport;
