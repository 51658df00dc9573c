//! Page/limit pagination options shared by the order and pizza listings.

/// 1-based page selection with a per-page limit.
///
/// Out-of-range input is clamped rather than rejected: page 0 becomes page 1,
/// a zero limit becomes the default, and the limit is capped so a single
/// request cannot drag the whole table into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub page: u32,
    pub limit: u32,
}

impl PageOptions {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .filter(|&l| l > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    /// Row offset for `LIMIT`/`OFFSET` style queries.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Number of pages needed for `total` rows under this limit.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let p = PageOptions::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 10);
        assert_eq!(p.offset(), 0);

        let p = PageOptions::new(Some(0), Some(0));
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, PageOptions::DEFAULT_LIMIT);

        let p = PageOptions::new(Some(3), Some(500));
        assert_eq!(p.limit, PageOptions::MAX_LIMIT);
    }

    #[test]
    fn offset_and_total_pages() {
        let p = PageOptions::new(Some(2), Some(3));
        assert_eq!(p.offset(), 3);
        assert_eq!(p.total_pages(9), 3);
        assert_eq!(p.total_pages(10), 4);
        assert_eq!(p.total_pages(0), 0);
    }
}
