use serde::{Deserialize, Serialize};

use crate::config;

/// Normalised page window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub page_size: usize,
    pub offset: usize,
}

impl Paging {
    /// Normalise caller-supplied values against the configured maximum
    pub fn normalize(page_size: Option<i64>, offset: Option<i64>) -> Self {
        Self::normalize_with_max(page_size, offset, config::config().paging.max_page_size)
    }

    /// Absent or negative page size means `max`; larger sizes are capped to
    /// `max`. Absent or negative offset means 0.
    pub fn normalize_with_max(page_size: Option<i64>, offset: Option<i64>, max: usize) -> Self {
        let page_size = match page_size.and_then(|size| usize::try_from(size).ok()) {
            None => max,
            Some(size) if size > max => {
                tracing::debug!("Page size {} exceeds max {}, capping to max", size, max);
                max
            }
            Some(size) => size,
        };

        let offset = offset
            .and_then(|offset| usize::try_from(offset).ok())
            .unwrap_or(0);

        Self { page_size, offset }
    }

    /// Cut the page window out of an already ordered result set
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.page_size).collect()
    }
}
