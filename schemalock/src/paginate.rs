//! Offset/limit pagination over list queries.
//!
//! A small query-composition helper: one bounded `find` plus one `count`
//! against the same filter, combined into a page with paging metadata.

use crate::document::Document;
use crate::errors::SchemaResult;
use crate::filter::Filter;
use crate::store::{DocumentStore, FindOptions};

pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// Options controlling the result window.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginateOptions {
    pub limit: u64,
    pub offset: u64,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        PaginateOptions {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl PaginateOptions {
    pub fn new() -> Self {
        PaginateOptions::default()
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Paging metadata accompanying a page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Paging {
    pub limit: u64,
    pub offset: u64,
    pub total_count: u64,
}

/// One page of documents plus its paging metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult {
    pub items: Vec<Document>,
    pub paging: Paging,
}

/// Runs a bounded find and a count for the same filter.
///
/// A `limit` of zero skips the find entirely (empty items) but still
/// returns the total count, so callers can probe collection sizes
/// without fetching documents.
pub fn paginate(
    store: &DocumentStore,
    collection: &str,
    filter: &Filter,
    options: &PaginateOptions,
) -> SchemaResult<PaginatedResult> {
    let items = if options.limit > 0 {
        let find_options = FindOptions::new()
            .skip(options.offset as usize)
            .limit(options.limit as usize);
        store.find(collection, filter, &find_options)?
    } else {
        Vec::new()
    };

    let total_count = store.count(collection, filter)?;

    Ok(PaginatedResult {
        items,
        paging: Paging {
            limit: options.limit,
            offset: options.offset,
            total_count,
        },
    })
}
