//! Page windows for paginated lists

use serde::Serialize;

/// Pages shown at once, excluding the first/last anchors
pub const MAX_VISIBLE_PAGES: u32 = 5;

/// Default page size of the transaction list
pub const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl std::fmt::Display for PageItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{}", n),
            PageItem::Ellipsis => f.write_str("..."),
        }
    }
}

/// Page numbers to display around `current`, with first/last anchors
/// and ellipses where pages are skipped.
pub fn page_numbers(current: u32, total: u32) -> Vec<PageItem> {
    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(PageItem::Page).collect();
    }

    let half = MAX_VISIBLE_PAGES / 2;
    let current = current.clamp(1, total);
    let mut start = current.saturating_sub(half).max(1);
    let mut end = (current + half).min(total);

    if current <= half {
        end = MAX_VISIBLE_PAGES;
    } else if current > total - half {
        start = total - MAX_VISIBLE_PAGES + 1;
    }

    let mut pages = Vec::with_capacity(MAX_VISIBLE_PAGES as usize + 4);
    if start > 1 {
        pages.push(PageItem::Page(1));
        if start > 2 {
            pages.push(PageItem::Ellipsis);
        }
    }
    pages.extend((start..=end).map(PageItem::Page));
    if end < total {
        if end < total - 1 {
            pages.push(PageItem::Ellipsis);
        }
        pages.push(PageItem::Page(total));
    }
    pages
}

/// Summary line such as `Showing 21-40 of 45 records`
pub fn showing_info(current: u32, per_page: u32, total_records: u64) -> String {
    if total_records == 0 || per_page == 0 {
        return "No data".to_string();
    }
    let per_page = u64::from(per_page);
    let start = (u64::from(current.max(1)) - 1) * per_page + 1;
    let end = (u64::from(current.max(1)) * per_page).min(total_records);
    format!("Showing {}-{} of {} records", start, end, total_records)
}

pub fn total_pages(total_records: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    total_records.div_ceil(u64::from(per_page)) as u32
}
