//! Domain types for notegen
//!
//! The provenance chain Topic -> ArticlePlan -> Article, plus the
//! GenerationLog telemetry record. All implement the Record trait for
//! NoteStore persistence.

mod article;
mod category;
mod generation_log;
mod id;
mod plan;
mod topic;

pub use article::{Article, ArticleStatus, count_chars};
pub use category::TopicCategory;
pub use generation_log::{GenerationLog, Stage};
pub use id::generate_id;
pub use plan::{ArticlePlan, PlanSection, PlanStatus};
pub(crate) use plan::deserialize_length;
pub use topic::{Topic, TopicStatus};

// Re-export notestore types for convenience
pub use notestore::{Filter, FilterOp, IndexValue, Order, Record, Store};
