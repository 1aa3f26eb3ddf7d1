//! NoteStore - generic SQLite-backed record store
//!
//! Records are serialized as JSON documents, one table per collection.
//! Fields a record wants to be queried by are materialized into a shared
//! index table so filtering and ordering never have to parse JSON.
//!
//! # Architecture
//!
//! ```text
//! notegen.db
//! ├── topics             (id, data, updated_at)
//! ├── article_plans      (id, data, updated_at)
//! ├── articles           (id, data, updated_at)
//! ├── generation_logs    (id, data, updated_at)
//! └── record_index       (collection, record_id, field, value)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use notestore::{Filter, Order, Store};
//!
//! let mut store = Store::open("notegen.db")?;
//! store.create(topic)?;
//! let available: Vec<Topic> = store.list(&[Filter::eq("status", "available")])?;
//! let newest: Vec<Topic> = store.list_ordered(&[], &[Order::desc("created_at")])?;
//! store.transaction(|tx| {
//!     tx.create(plan)?;
//!     tx.update(topic)
//! })?;
//! ```

mod record;
mod store;

pub use record::{Filter, FilterOp, IndexValue, Order, Record, now_ms};
pub use store::{Store, StoreTx};

/// Name of the table holding materialized index values
pub const INDEX_TABLE: &str = "record_index";
