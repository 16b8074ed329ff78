//! Reassembly of multi-page documents from filtered search results

use crate::error::Result;
use crate::store::{ResultRecord, StoreBackend, VectorStoreGateway};
use serde::{Deserialize, Serialize};

/// How many chunks to request when gathering a document's pages.
/// Documents longer than this come back truncated.
pub const PAGE_FETCH_LIMIT: usize = 30;

/// One normalized chunk of a reconstructed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub content: String,
    pub file_name: String,
    pub i_page: i64,
    pub file_path: String,
}

/// Rebuilds documents from the chunks stored in the collection
pub struct DocumentAssembler<'a, S: StoreBackend> {
    gateway: &'a VectorStoreGateway<S>,
}

impl<'a, S: StoreBackend> DocumentAssembler<'a, S> {
    pub fn new(gateway: &'a VectorStoreGateway<S>) -> Self {
        Self { gateway }
    }

    /// Every chunk whose file name matches `file_name_pattern`, in ascending
    /// page order.
    ///
    /// A pattern without a wildcard is widened to a substring match
    /// (`report1` becomes `*report1*`). Chunks sharing a page index keep
    /// their encounter order. An empty pattern yields an empty result
    /// without touching the store.
    pub async fn get_all_pages(&self, file_name_pattern: &str) -> Result<Vec<PageRecord>> {
        if file_name_pattern.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = widen_pattern(file_name_pattern);
        // relevance ranking is irrelevant here, only the filter matters
        let records = self
            .gateway
            .search_from_file_name("", &pattern, PAGE_FETCH_LIMIT)
            .await?;

        let mut pages: Vec<PageRecord> = records.iter().map(normalize_record).collect();
        pages.sort_by_key(|page| page.i_page);
        Ok(pages)
    }

    /// Names of all documents the collection holds
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        self.gateway.list_distinct_file_names().await
    }
}

/// Wrap a wildcard-free pattern as `*pattern*` so it matches as a substring
fn widen_pattern(pattern: &str) -> String {
    if pattern.contains('*') {
        pattern.to_string()
    } else {
        format!("*{}*", pattern)
    }
}

/// Shape a raw stored record into a [`PageRecord`], defaulting missing or
/// mistyped fields to empty string / zero
fn normalize_record(record: &ResultRecord) -> PageRecord {
    let text_field = |name: &str| {
        record
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    PageRecord {
        content: text_field("text"),
        file_name: text_field("file_name"),
        i_page: record.get("i_page").and_then(|v| v.as_i64()).unwrap_or(0),
        file_path: text_field("file_path"),
    }
}
