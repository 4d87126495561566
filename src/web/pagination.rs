//! Listing pagination.

use serde::Serialize;

use super::error::Failure;
use super::forms::FormData;

/// Read the zero-based page number `p`.
///
/// Missing or empty means page 0; anything but a non-negative integer is a
/// bad request.
pub fn parse_page(query: &FormData) -> Result<i64, Failure> {
    match query.get("p").map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|page| *page >= 0)
            .ok_or_else(|| Failure::bad_request(format!("invalid page number '{raw}'"))),
    }
}

/// Paging state of a rendered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub next_page: i64,
    pub has_next: bool,
    pub offset: i64,
    pub more_url: Option<String>,
}

impl Pagination {
    /// Paging for `page` with `limit` rows per page, `returned` rows fetched.
    ///
    /// A full page signals a next page, even when nothing follows it.
    pub fn new(page: i64, limit: i64, returned: usize) -> Self {
        let has_next = i64::try_from(returned).is_ok_and(|n| n == limit);
        Self {
            page,
            next_page: if has_next { page.saturating_add(1) } else { page },
            has_next,
            offset: offset(page, limit),
            more_url: None,
        }
    }

    /// Set `more_url` to `path` with `params` and `p=<next_page>`.
    pub fn with_more_url(mut self, path: &str, params: &[(&str, &str)]) -> Self {
        if self.has_next {
            let next = self.next_page.to_string();
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .append_pair("p", &next)
                .finish();
            self.more_url = Some(format!("{path}?{query}"));
        }
        self
    }
}

/// Offset of `page` for `limit` rows per page.
pub fn offset(page: i64, limit: i64) -> i64 {
    page.saturating_mul(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(&FormData::default()).unwrap(), 0);
        assert_eq!(parse_page(&FormData::parse(b"p=")).unwrap(), 0);
        assert_eq!(parse_page(&FormData::parse(b"p=3")).unwrap(), 3);
        assert!(parse_page(&FormData::parse(b"p=-1")).is_err());
        assert!(parse_page(&FormData::parse(b"p=two")).is_err());
    }

    #[test]
    fn test_partial_page_has_no_next() {
        let page = Pagination::new(0, 30, 12);
        assert!(!page.has_next);
        assert_eq!(page.next_page, 0);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn test_full_page_has_next() {
        let page = Pagination::new(2, 30, 30);
        assert!(page.has_next);
        assert_eq!(page.next_page, 3);
        assert_eq!(page.offset, 60);
    }

    #[test]
    fn test_more_url() {
        let page = Pagination::new(0, 2, 2).with_more_url("/domain", &[("Site", "example.com")]);
        assert_eq!(page.more_url.as_deref(), Some("/domain?Site=example.com&p=1"));

        let last = Pagination::new(1, 2, 1).with_more_url("/", &[]);
        assert!(last.more_url.is_none());
    }

    #[test]
    fn test_offset_saturates() {
        assert_eq!(offset(3, 30), 90);
        assert_eq!(offset(i64::MAX, 30), i64::MAX);
    }
}
