//! In-memory [`SearchQueryStore`].

use std::sync::RwLock;

use chrono::Utc;
use orbit_shared::{NewSearchQuery, SearchQuery};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::SearchQueryStore;

#[derive(Debug, Default)]
pub struct MemorySearchStore {
    queries: RwLock<Vec<SearchQuery>>,
}

impl MemorySearchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SearchQueryStore for MemorySearchStore {
    fn create_query(&self, new: NewSearchQuery) -> Result<SearchQuery> {
        let mut queries = self
            .queries
            .write()
            .map_err(|_| StoreError::LockPoisoned("search queries"))?;

        let query = SearchQuery {
            id: Uuid::new_v4(),
            query: new.query,
            kind: new.kind,
            results: new.results,
            timestamp: Utc::now(),
        };
        queries.push(query.clone());
        Ok(query)
    }

    fn list_queries(&self, limit: usize) -> Result<Vec<SearchQuery>> {
        let queries = self
            .queries
            .read()
            .map_err(|_| StoreError::LockPoisoned("search queries"))?;

        Ok(queries.iter().rev().take(limit).cloned().collect())
    }
}
