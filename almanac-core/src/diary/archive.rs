//! Merged, sorted collection of diary entries and its paginated views.

use almanac_types::{DiaryPage, PaginationInfo, ParsedEntry};
use serde::{Deserialize, Serialize};

/// Entries for one `YYYY-Qn` bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterGroup {
    pub quarter_key: String,
    pub entry_ids: Vec<String>,
}

/// Every diary entry of a site, newest first
#[derive(Debug, Clone, Default)]
pub struct DiaryArchive {
    entries: Vec<ParsedEntry>,
}

impl DiaryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ParsedEntry>) -> Self {
        let mut archive = Self::new();
        for entry in entries {
            archive.insert(entry);
        }
        archive
    }

    /// Add an entry. An entry covering the same span as an existing one is merged
    /// into it, its time blocks appended after the ones already there.
    pub fn insert(&mut self, entry: ParsedEntry) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.span_key() == entry.span_key())
        {
            existing.time_blocks.extend(entry.time_blocks);
            return;
        }

        self.entries.push(entry);
        // Stable: entries with equal sort keys keep load order
        self.entries
            .sort_by(|a, b| b.meta.sort_key.cmp(&a.meta.sort_key));
    }

    pub fn entries(&self) -> &[ParsedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pages; an empty archive still has one (empty) page
    pub fn total_pages(&self, per_page: u32) -> u32 {
        let per_page = per_page.max(1) as usize;
        (self.entries.len().div_ceil(per_page) as u32).max(1)
    }

    /// Page `page` (1-based). `None` for page 0 or past the last page.
    pub fn page(&self, page: u32, per_page: u32) -> Option<DiaryPage> {
        let total_pages = self.total_pages(per_page);
        if page == 0 || page > total_pages {
            return None;
        }

        let per_page = per_page.max(1);
        let start = ((page - 1) * per_page) as usize;
        let entries = self
            .entries
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();

        Some(DiaryPage {
            entries,
            pagination: PaginationInfo {
                current_page: page,
                total_pages,
                has_more: page < total_pages,
                items_per_page: per_page,
            },
        })
    }

    /// All pages in order
    pub fn pages(&self, per_page: u32) -> impl Iterator<Item = DiaryPage> + '_ {
        (1..=self.total_pages(per_page)).filter_map(move |n| self.page(n, per_page))
    }

    /// Entry ids grouped by quarter, most recent quarter first
    pub fn by_quarter(&self) -> Vec<QuarterGroup> {
        let mut groups: Vec<QuarterGroup> = Vec::new();
        for entry in &self.entries {
            let key = &entry.meta.quarter_key;
            match groups.iter_mut().find(|g| &g.quarter_key == key) {
                Some(group) => group.entry_ids.push(entry.entry_id()),
                None => groups.push(QuarterGroup {
                    quarter_key: key.clone(),
                    entry_ids: vec![entry.entry_id()],
                }),
            }
        }
        groups.sort_by(|a, b| b.quarter_key.cmp(&a.quarter_key));
        groups
    }
}
