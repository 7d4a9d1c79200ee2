//! Page windowing and envelope arithmetic.

use crate::config::{EmptyTotalPages, OverMaxPolicy, PaginationSettings};
use crate::error::AppError;
use crate::query::EntityQuery;
use crate::response::PaginationMeta;
use crate::store::{Row, Store};

/// Page parameters as received; `None` means use the default.
#[derive(Clone, Copy, Debug, Default)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Validated page parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub per_page: u32,
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

pub fn page_window(settings: &PaginationSettings, req: PageRequest) -> Result<PageWindow, AppError> {
    let page = req.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::PaginationRange("page must be at least 1".into()));
    }
    let per_page = req.per_page.unwrap_or(settings.default_per_page);
    if per_page == 0 {
        return Err(AppError::PaginationRange("per_page must be at least 1".into()));
    }
    let per_page = if per_page > settings.max_per_page {
        match settings.over_max {
            OverMaxPolicy::Reject => {
                return Err(AppError::PaginationRange(format!(
                    "per_page {} exceeds maximum {}",
                    per_page, settings.max_per_page
                )))
            }
            OverMaxPolicy::Clamp => settings.max_per_page,
        }
    } else {
        per_page
    };
    Ok(PageWindow { page, per_page })
}

/// `ceil(total_items / per_page)`, with the empty case governed by policy.
pub fn total_pages(total_items: u64, per_page: u32, empty: EmptyTotalPages) -> u64 {
    let per_page = u64::from(per_page.max(1));
    let pages = total_items.div_ceil(per_page);
    match (pages, empty) {
        (0, EmptyTotalPages::One) => 1,
        (n, _) => n,
    }
}

/// Count, then fetch the window. Pages past the end skip the data query and come back empty.
/// The two statements are not snapshot-consistent with each other.
pub async fn paginate(
    store: &dyn Store,
    query: EntityQuery<'_>,
    window: PageWindow,
    settings: &PaginationSettings,
) -> Result<(Vec<Row>, PaginationMeta), AppError> {
    let total_items = store.count(&query.count_query()).await?;
    let pages = total_pages(total_items, window.per_page, settings.empty_total_pages);
    let meta = PaginationMeta {
        page: window.page,
        per_page: window.per_page,
        total_items,
        total_pages: pages,
        max_page: pages,
    };
    if window.offset() >= total_items {
        return Ok((Vec::new(), meta));
    }
    let rows = store
        .fetch(&query.window(u64::from(window.per_page), window.offset()))
        .await?;
    Ok((rows, meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(over_max: OverMaxPolicy) -> PaginationSettings {
        PaginationSettings {
            over_max,
            ..Default::default()
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(total_pages(134, 20, EmptyTotalPages::One), 7);
        assert_eq!(total_pages(140, 20, EmptyTotalPages::One), 7);
        assert_eq!(total_pages(141, 20, EmptyTotalPages::Zero), 8);
        assert_eq!(total_pages(1, 50, EmptyTotalPages::Zero), 1);
    }

    #[test]
    fn empty_total_pages_both_policies() {
        assert_eq!(total_pages(0, 20, EmptyTotalPages::One), 1);
        assert_eq!(total_pages(0, 20, EmptyTotalPages::Zero), 0);
    }

    #[test]
    fn defaults_apply() {
        let w = page_window(&PaginationSettings::default(), PageRequest::default()).unwrap();
        assert_eq!(w, PageWindow { page: 1, per_page: 20 });
        assert_eq!(w.offset(), 0);
        let w = page_window(
            &PaginationSettings::default(),
            PageRequest {
                page: Some(7),
                per_page: Some(20),
            },
        )
        .unwrap();
        assert_eq!(w.offset(), 120);
    }

    #[test]
    fn over_max_rejects_or_clamps() {
        let req = PageRequest {
            page: None,
            per_page: Some(51),
        };
        assert!(matches!(
            page_window(&settings(OverMaxPolicy::Reject), req),
            Err(AppError::PaginationRange(_))
        ));
        let w = page_window(&settings(OverMaxPolicy::Clamp), req).unwrap();
        assert_eq!(w.per_page, 50);
        let at_max = PageRequest {
            page: None,
            per_page: Some(50),
        };
        assert_eq!(page_window(&settings(OverMaxPolicy::Reject), at_max).unwrap().per_page, 50);
    }

    #[test]
    fn zero_values_rejected() {
        let s = PaginationSettings::default();
        for req in [
            PageRequest {
                page: Some(0),
                per_page: None,
            },
            PageRequest {
                page: None,
                per_page: Some(0),
            },
        ] {
            assert!(matches!(page_window(&s, req), Err(AppError::PaginationRange(_))));
        }
    }
}
