//! Window merger over a paginated upstream listing
//!
//! A window is a fixed-size slice presented to the browsing UI. The upstream
//! pages have their own size, so one window is filled from
//! `ceil(window_size / page_size)` consecutive upstream pages fetched
//! concurrently, concatenated in upstream order and truncated.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, PageFailure};
use crate::models::{CatalogItem, CatalogQuery, UpstreamPage};
use crate::source::CatalogSource;

/// Upstream pages needed to fill one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    /// First upstream page (1-based)
    pub first_page: u32,
    pub page_count: u32,
}

impl WindowPlan {
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.first_page..self.first_page + self.page_count
    }
}

/// Compute which upstream pages a window covers
///
/// `window_index` is 1-based. Both sizes must be non-zero.
pub fn plan_window(
    window_index: u32,
    window_size: u32,
    page_size: u32,
) -> Result<WindowPlan, CatalogError> {
    if window_index == 0 {
        return Err(CatalogError::Validation("window index starts at 1".into()));
    }
    if window_size == 0 {
        return Err(CatalogError::Validation("window size must be at least 1".into()));
    }
    if page_size == 0 {
        return Err(CatalogError::Validation("upstream page size must be at least 1".into()));
    }

    let page_count = window_size.div_ceil(page_size);
    let first_page = (window_index - 1)
        .checked_mul(page_count)
        .and_then(|p| p.checked_add(1))
        // the exclusive end of the page range must also fit
        .filter(|first| first.checked_add(page_count).is_some())
        .ok_or_else(|| CatalogError::Validation("window index out of range".into()))?;

    Ok(WindowPlan { first_page, page_count })
}

/// Number of windows needed to present `total_items`
pub fn total_windows(total_items: u64, window_size: u32) -> u32 {
    if window_size == 0 {
        return 0;
    }
    let windows = total_items.div_ceil(u64::from(window_size));
    u32::try_from(windows).unwrap_or(u32::MAX)
}

/// One merged window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogWindow {
    pub items: Vec<CatalogItem>,
    pub window_index: u32,
    pub window_size: u32,
    /// `None` when some pages failed: a count from incomplete data is never reported
    pub total_windows: Option<u32>,
    /// Upstream pages that could not be fetched for this window
    pub failed_pages: Vec<PageFailure>,
}

impl CatalogWindow {
    /// Some but not all upstream pages failed
    pub fn is_partial(&self) -> bool {
        !self.failed_pages.is_empty()
    }
}

/// Fills output windows from a [`CatalogSource`]
#[derive(Clone)]
pub struct CatalogPageMerger {
    source: Arc<dyn CatalogSource>,
    fetch_timeout: Duration,
}

impl CatalogPageMerger {
    pub fn new(source: Arc<dyn CatalogSource>, fetch_timeout: Duration) -> Self {
        Self { source, fetch_timeout }
    }

    /// Upstream page size of the underlying source
    pub fn page_size(&self) -> u32 {
        self.source.page_size()
    }

    /// Fetch and merge one window
    ///
    /// Fails only when the request is invalid or every upstream page failed.
    pub async fn fetch_window(
        &self,
        query: &CatalogQuery,
        window_index: u32,
        window_size: u32,
    ) -> Result<CatalogWindow, CatalogError> {
        query.validate().map_err(CatalogError::Validation)?;
        let plan = plan_window(window_index, window_size, self.source.page_size())?;

        debug!(
            query = %query,
            window_index,
            window_size,
            first_page = plan.first_page,
            page_count = plan.page_count,
            "Fetching catalog window"
        );

        let fetches = plan.pages().map(|page| self.fetch_one(query, page));
        let results = join_all(fetches).await;

        let mut pages: Vec<UpstreamPage> = Vec::with_capacity(results.len());
        let mut failures: Vec<PageFailure> = Vec::new();
        for (page, result) in plan.pages().zip(results) {
            match result {
                Ok(upstream) => pages.push(upstream),
                Err(e) => {
                    warn!(query = %query, page, error = %e, "Upstream page fetch failed");
                    failures.push(PageFailure { page, reason: e.to_string() });
                }
            }
        }

        if pages.is_empty() {
            return Err(CatalogError::AllPagesFailed { failures });
        }

        let total_items = pages.iter().map(|p| p.total_results).max().unwrap_or(0);
        let mut items: Vec<CatalogItem> = pages.into_iter().flat_map(|p| p.items).collect();
        items.truncate(window_size as usize);

        let total = if failures.is_empty() {
            Some(total_windows(total_items, window_size))
        } else {
            info!(
                query = %query,
                window_index,
                failed = failures.len(),
                items = items.len(),
                "Presenting partial catalog window"
            );
            None
        };

        Ok(CatalogWindow {
            items,
            window_index,
            window_size,
            total_windows: total,
            failed_pages: failures,
        })
    }

    async fn fetch_one(&self, query: &CatalogQuery, page: u32) -> Result<UpstreamPage, CatalogError> {
        match timeout(self.fetch_timeout, self.source.fetch_page(query, page)).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Timeout(self.fetch_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_window_of_24_over_pages_of_20() {
        let plan = plan_window(1, 24, 20).unwrap();
        assert_eq!(plan, WindowPlan { first_page: 1, page_count: 2 });
        assert_eq!(plan.pages().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_later_windows_advance_by_page_count() {
        assert_eq!(plan_window(2, 24, 20).unwrap().first_page, 3);
        assert_eq!(plan_window(5, 24, 20).unwrap().first_page, 9);
        assert_eq!(plan_window(3, 20, 20).unwrap(), WindowPlan { first_page: 3, page_count: 1 });
        assert_eq!(plan_window(1, 5, 20).unwrap().page_count, 1);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(plan_window(0, 24, 20), Err(CatalogError::Validation(_))));
        assert!(matches!(plan_window(1, 0, 20), Err(CatalogError::Validation(_))));
        assert!(matches!(plan_window(1, 24, 0), Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_window_past_last_upstream_page_rejected() {
        assert!(matches!(
            plan_window(2_147_483_648, 24, 20),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(plan_window(u32::MAX, 20, 20), Err(CatalogError::Validation(_))));

        // last window whose page range still fits
        let plan = plan_window(2_147_483_647, 24, 20).unwrap();
        assert_eq!(plan.first_page, u32::MAX - 2);
        assert_eq!(plan.pages().count(), 2);
    }

    #[test]
    fn test_total_windows_rounds_up() {
        assert_eq!(total_windows(0, 24), 0);
        assert_eq!(total_windows(24, 24), 1);
        assert_eq!(total_windows(25, 24), 2);
        assert_eq!(total_windows(10000, 24), 417);
        assert_eq!(total_windows(7, 1), 7);
    }

    #[test]
    fn test_total_windows_for_many_sizes() {
        for window_size in 1..=50u32 {
            for total in [0u64, 1, 19, 20, 21, 99, 100, 101, 1234] {
                let windows = u64::from(total_windows(total, window_size));
                assert!(windows * u64::from(window_size) >= total);
                if windows > 0 {
                    assert!((windows - 1) * u64::from(window_size) < total);
                }
            }
        }
    }
}
