// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter, sort and paginate the submission queue.
//!
//! A [`Query`] bundles the filter controls, the selected sort and the current page. Running it
//! against a snapshot of the collection first filters (all criteria combined with AND), then sorts
//! with a stable sort and finally cuts out the requested page.
//!
//! Changing a filter or the sort resets the query to the first page. When the collection shrinks
//! underneath, the current page is clamped into range the next time the query runs.
mod filter;
mod page;
mod sort;

use serde::{Deserialize, Serialize};
use steward_core::Submission;

pub use filter::{
    ALL, Criterion, FilterError, FilterField, FilterState, OPEN, StatusFilter, filter,
};
pub use page::{PAGE_SIZE, PageView, clamp_page, paginate, total_pages};
pub use sort::{SortDirection, SortError, SortKey, SortState, collate, collate_optional};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub filter: FilterState,
    pub sort: SortState,
    page: usize,
    page_size: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Query {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: FilterState::default(),
            sort: SortState::default(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_filter(&mut self, field: FilterField, value: &str) -> Result<(), FilterError> {
        self.filter.set(field, value)?;
        self.page = 1;
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.page = 1;
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort.toggle(key);
        self.page = 1;
    }

    /// Requests a page, it gets clamped when the query runs.
    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Filtered and sorted submissions, without pagination.
    pub fn select<'a>(&self, submissions: &'a [Submission]) -> Vec<&'a Submission> {
        let mut selected = filter(submissions, &self.filter.criteria());
        self.sort.sort(&mut selected);
        selected
    }

    /// Runs the query and remembers the clamped page.
    pub fn run(&mut self, submissions: &[Submission]) -> PageView<Submission> {
        let selected = self.select(submissions);
        let view = paginate(&selected, self.page, self.page_size);
        self.page = view.page;

        PageView {
            items: view.items.into_iter().cloned().collect(),
            page: view.page,
            total_pages: view.total_pages,
            total_items: view.total_items,
            page_size: view.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use steward_core::{AssetType, Priority, Status, Submission, Timestamp};

    use super::{FilterField, Query, SortKey};

    fn collection(len: usize) -> Vec<Submission> {
        (0..len)
            .map(|i| {
                let mut submission = Submission::new(
                    format!("S{i}"),
                    format!("Asset {i}"),
                    AssetType::Dataset,
                    "p1",
                    "Analytics Team",
                    Timestamp::from_secs(i as u64),
                );
                if i % 2 == 0 {
                    submission.status = Status::Approved;
                }
                if i % 3 == 0 {
                    submission.priority = Priority::High;
                }
                submission
            })
            .collect()
    }

    #[test]
    fn newest_first_by_default() {
        let mut query = Query::default();
        let view = query.run(&collection(25));

        assert_eq!(view.total_pages, 3);
        assert_eq!(view.items.len(), 10);
        assert_eq!(view.items[0].id.as_str(), "S24");
    }

    #[test]
    fn filter_change_resets_page() {
        let items = collection(25);
        let mut query = Query::default();
        query.go_to_page(3);
        assert_eq!(query.run(&items).page, 3);

        query.set_filter(FilterField::Status, "open").unwrap();
        assert_eq!(query.page(), 1);
        let view = query.run(&items);
        assert_eq!(view.total_items, 12);
        assert!(view.items.iter().all(|item| item.status == Status::Pending));

        query.go_to_page(2);
        query.toggle_sort(SortKey::Priority);
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn shrinking_collection_clamps_page() {
        let mut query = Query::default();
        query.go_to_page(3);
        query.run(&collection(25));

        let view = query.run(&collection(12));
        assert_eq!(view.page, 2);
        assert_eq!(query.page(), 2);
        assert_eq!(view.items.len(), 2);

        let view = query.run(&[]);
        assert_eq!(view.page, 1);
        assert_eq!(view.total_pages, 0);
    }

    #[test]
    fn priority_descending() {
        let mut query = Query::new(5);
        query.toggle_sort(SortKey::Priority);
        let view = query.run(&collection(6));

        let priorities: Vec<Priority> = view.items.iter().map(|item| item.priority).collect();
        assert_eq!(
            priorities,
            vec![
                Priority::High,
                Priority::High,
                Priority::Medium,
                Priority::Medium,
                Priority::Medium
            ]
        );
        assert_eq!(view.total_pages, 2);
    }
}
