//! Document database operations abstraction for testability

use anyhow::Result;

/// Abstraction for document database reads, enabling mocking in tests
pub trait MongoOperations: Send + Sync {
    /// Names of all databases on the server
    fn list_database_names(&self) -> Result<Vec<String>>;

    /// Names of all collections in a database
    fn list_collection_names(&self, database: &str) -> Result<Vec<String>>;

    /// Every document of a collection, as relaxed Extended JSON
    fn fetch_documents(&self, database: &str, collection: &str) -> Result<Vec<serde_json::Value>>;
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use anyhow::anyhow;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// Recorded operation call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum MongoCall {
        ListDatabases,
        ListCollections { database: String },
        Fetch { database: String, collection: String },
    }

    /// In-memory server: database -> collection -> documents
    #[derive(Clone, Default)]
    pub struct MockMongoOps {
        /// Recorded operation calls
        pub calls: Arc<Mutex<Vec<MongoCall>>>,
        pub databases: Arc<Mutex<BTreeMap<String, BTreeMap<String, Vec<serde_json::Value>>>>>,
        /// Whether every call should fail (server unreachable)
        pub should_fail: Arc<Mutex<bool>>,
    }

    impl MockMongoOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a collection with documents, creating the database if needed
        pub fn with_collection(self, database: &str, collection: &str, documents: Vec<serde_json::Value>) -> Self {
            self.set_collection(database, collection, documents);
            self
        }

        /// Add an empty database
        pub fn with_database(self, database: &str) -> Self {
            self.databases
                .lock()
                .unwrap()
                .entry(database.to_string())
                .or_default();
            self
        }

        /// Make every call fail
        pub fn with_failure(self) -> Self {
            *self.should_fail.lock().unwrap() = true;
            self
        }

        /// Replace a collection's documents after construction
        pub fn set_collection(&self, database: &str, collection: &str, documents: Vec<serde_json::Value>) {
            self.databases
                .lock()
                .unwrap()
                .entry(database.to_string())
                .or_default()
                .insert(collection.to_string(), documents);
        }

        /// Drop a collection after construction
        pub fn drop_collection(&self, database: &str, collection: &str) {
            if let Some(db) = self.databases.lock().unwrap().get_mut(database) {
                db.remove(collection);
            }
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<MongoCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: MongoCall) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if *self.should_fail.lock().unwrap() {
                return Err(anyhow!("Mock database failure"));
            }
            Ok(())
        }
    }

    impl MongoOperations for MockMongoOps {
        fn list_database_names(&self) -> Result<Vec<String>> {
            self.record(MongoCall::ListDatabases)?;
            Ok(self.databases.lock().unwrap().keys().cloned().collect())
        }

        fn list_collection_names(&self, database: &str) -> Result<Vec<String>> {
            self.record(MongoCall::ListCollections {
                database: database.to_string(),
            })?;
            Ok(self
                .databases
                .lock()
                .unwrap()
                .get(database)
                .map(|db| db.keys().cloned().collect())
                .unwrap_or_default())
        }

        fn fetch_documents(&self, database: &str, collection: &str) -> Result<Vec<serde_json::Value>> {
            self.record(MongoCall::Fetch {
                database: database.to_string(),
                collection: collection.to_string(),
            })?;
            Ok(self
                .databases
                .lock()
                .unwrap()
                .get(database)
                .and_then(|db| db.get(collection))
                .cloned()
                .unwrap_or_default())
        }
    }
}
