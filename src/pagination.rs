use std::ops::RangeInclusive;

use tracing::trace;

use crate::domain::GridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page: usize,
    page_size: usize,
    total_items: usize,
}

impl PaginationState {
    pub fn new(page_size: usize) -> Result<Self, GridError> {
        if page_size == 0 {
            return Err(GridError::Config("page size must be positive".to_string()));
        }
        Ok(PaginationState {
            page: 1,
            page_size,
            total_items: 0,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size).max(1)
    }

    /// Record the data source's item count. A page past the new last page is
    /// pulled back onto it; returns whether that moved the page.
    pub fn set_total_items(&mut self, total_items: usize) -> bool {
        self.total_items = total_items;
        let last = self.total_pages();
        if self.page <= last {
            return false;
        }
        trace!("Page {} -> {} after the total shrank", self.page, last);
        self.page = last;
        true
    }

    pub fn skip(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    pub fn take(&self) -> usize {
        self.page_size
    }

    /// Jump to `page`, clamped to the valid range. Returns whether the page changed.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        let target = page.clamp(1, self.total_pages());
        if target == self.page {
            return false;
        }
        trace!("Page {} -> {}", self.page, target);
        self.page = target;
        true
    }

    pub fn next(&mut self) -> bool {
        if self.page >= self.total_pages() {
            return false;
        }
        self.go_to_page(self.page + 1)
    }

    pub fn previous(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.go_to_page(self.page - 1)
    }

    /// Back to the first page, e.g. after the result set changed.
    pub fn reset(&mut self) -> bool {
        let changed = self.page != 1;
        self.page = 1;
        changed
    }

    pub fn controls(&self, max_mid: usize) -> Vec<PageItem> {
        page_items(self.page, self.total_pages(), max_mid)
    }
}

/// Consecutive page numbers shown around `current`.
pub fn page_window(current: usize, total: usize, max_mid: usize) -> RangeInclusive<usize> {
    let max_mid = max_mid.max(1);
    let total = total.max(1);
    if total <= max_mid + 1 {
        return 1..=total;
    }
    let current = current.clamp(1, total);
    let mut start = current.saturating_sub(max_mid / 2).max(1);
    let end = (start + max_mid - 1).min(total);
    if (end + 1).saturating_sub(start) < max_mid {
        start = (end + 1).saturating_sub(max_mid).max(1);
    }
    start..=end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Previous { enabled: bool },
    Page { number: usize, current: bool },
    Ellipsis,
    Next { enabled: bool },
}

/// Full pagination bar: previous, optional jump to the first page, the
/// window around the current page, optional jump to the last page, next.
pub fn page_items(current: usize, total: usize, max_mid: usize) -> Vec<PageItem> {
    let total = total.max(1);
    let current = current.clamp(1, total);
    let page = |number| PageItem::Page {
        number,
        current: number == current,
    };
    let gapped = total > max_mid + 2;

    let mut items = vec![PageItem::Previous {
        enabled: current > 1,
    }];
    if current > 1 + max_mid {
        items.push(page(1));
        if gapped {
            items.push(PageItem::Ellipsis);
        }
    }
    items.extend(page_window(current, total, max_mid).map(page));
    if current + max_mid < total {
        if gapped {
            items.push(PageItem::Ellipsis);
        }
        items.push(page(total));
    }
    items.push(PageItem::Next {
        enabled: current < total,
    });
    items
}
