//! On-disk store behaviour

use notestore::{Filter, IndexValue, Order, Record, Store};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tempfile::TempDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    id: String,
    status: String,
    created_at: i64,
}

impl Record for Entry {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.created_at
    }

    fn collection_name() -> &'static str {
        "entries"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), IndexValue::String(self.status.clone()));
        fields.insert("created_at".to_string(), IndexValue::Int(self.created_at));
        fields
    }
}

fn entry(id: &str, status: &str, created_at: i64) -> Entry {
    Entry {
        id: id.to_string(),
        status: status.to_string(),
        created_at,
    }
}

#[test]
fn test_records_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("store.db");

    {
        let mut store = Store::open(&path).unwrap();
        store
            .create_many(vec![entry("a", "open", 1), entry("b", "closed", 2), entry("c", "open", 3)])
            .unwrap();
    }

    let store = Store::open(&path).unwrap();
    let open: Vec<Entry> = store
        .list_ordered(&[Filter::eq("status", "open")], &[Order::desc("created_at")])
        .unwrap();
    let ids: Vec<&str> = open.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]);
    assert_eq!(store.count::<Entry>(&[]).unwrap(), 3);
}

#[test]
fn test_empty_collection_lists_nothing() {
    let temp = TempDir::new().unwrap();
    let store = Store::open(temp.path().join("store.db")).unwrap();
    assert!(store.list::<Entry>(&[]).unwrap().is_empty());
    assert_eq!(store.count::<Entry>(&[Filter::eq("status", "open")]).unwrap(), 0);
}
