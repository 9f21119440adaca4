//! Stores a few versions of an object and prints its change history,
//! with debug logs of every read.

use std::collections::BTreeSet;
use std::sync::Arc;

use typekv::query::{Filter, KeyDefinition, KeyPart};
use typekv::{MemoryStore, ObjectValues, PropertyReference, PropertyValue, Schema, Selection, Value, ValueType};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let schema = Arc::new(
        Schema::builder("Event")
            .value(1, "at", ValueType::DateTime)
            .unique_value(2, "code", ValueType::Text)
            .value(3, "title", ValueType::Text)
            .list(4, "speakers", ValueType::Text)
            .set(5, "tags", ValueType::Text)
            .build()
            .expect("valid schema"),
    );
    let at = KeyPart::from_schema(&schema, 1, true).expect("scalar key property");
    let key_definition = KeyDefinition::key(vec![at]).expect("valid key");

    let mut store = MemoryStore::new(schema);
    let values = ObjectValues::new()
        .with(1, Value::date_time(2018, 12, 8, 12, 33, 23))
        .with(2, Value::text("EV-1"))
        .with(3, Value::text("Opening"))
        .with(4, PropertyValue::List(vec![Value::text("Ann"), Value::text("Bo")]))
        .with(5, PropertyValue::Set(BTreeSet::from([Value::text("keynote")])));
    let key = key_definition.encode(&values).expect("key values present");

    store.put(&key, 1, &values).expect("values match schema");
    store
        .put(&key, 2, &ObjectValues::new().with(3, Value::text("Opening keynote")))
        .expect("values match schema");
    store
        .delete(&key, 3, &PropertyReference::property(4).list_item(1))
        .expect("list item reference");
    store.soft_delete(&key, 4, true);

    println!("key: {}", hex::encode(&key));
    for changes in store.changes(&key, 0, None).expect("readable history") {
        print!("{}", changes);
    }

    let filter = Filter::Equals(PropertyReference::property(2), Value::text("EV-1"));
    let title_only = Selection::new().select(3);
    let found = store
        .scan_changes(&key_definition, &filter, 2, Some(&title_only))
        .expect("scan");
    println!("\nfound {} object(s) by code, {} version(s) since 2", found.len(), found.first().map_or(0, |(_, c)| c.len()));
}
