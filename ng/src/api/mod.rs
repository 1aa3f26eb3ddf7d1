//! Invocation surface
//!
//! Routes method + path requests to the stage orchestrators and to the
//! curation operations on stored topics, plans, and articles.

mod messages;
mod router;

pub use messages::{ApiRequest, ApiResponse, Method};
pub use router::Api;
