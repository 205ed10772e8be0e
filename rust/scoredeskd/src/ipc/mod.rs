mod error;
mod handlers;
mod router;
mod state;
mod types;

pub use handlers::records::apply_source_event;
pub use router::handle_request;
pub use types::{AppState, Event, Request};
