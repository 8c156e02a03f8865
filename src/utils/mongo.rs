//! Document database client

use super::mongo_ops::MongoOperations;
use anyhow::{Context, Result};
use mongodb::bson::{Bson, Document};
use mongodb::sync::Client;
use tracing::debug;

/// Blocking MongoDB reader
pub struct MongoSource {
    client: Client,
}

impl MongoSource {
    /// Parse the connection string. The driver connects lazily, so an
    /// unreachable server only surfaces on the first query.
    pub fn connect(url: &str) -> Result<Self> {
        let client = Client::with_uri_str(url).context("Failed to create database client")?;
        Ok(Self { client })
    }
}

impl MongoOperations for MongoSource {
    fn list_database_names(&self) -> Result<Vec<String>> {
        self.client
            .list_database_names(None, None)
            .context("Failed to list databases")
    }

    fn list_collection_names(&self, database: &str) -> Result<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names(None)
            .with_context(|| format!("Failed to list collections of '{}'", database))
    }

    fn fetch_documents(&self, database: &str, collection: &str) -> Result<Vec<serde_json::Value>> {
        let cursor = self
            .client
            .database(database)
            .collection::<Document>(collection)
            .find(None, None)
            .with_context(|| format!("Failed to query {}.{}", database, collection))?;

        let mut documents = Vec::new();
        for document in cursor {
            let document =
                document.with_context(|| format!("Failed to read from {}.{}", database, collection))?;
            documents.push(Bson::Document(document).into_relaxed_extjson());
        }

        debug!("Fetched {} documents from {}.{}", documents.len(), database, collection);
        Ok(documents)
    }
}
