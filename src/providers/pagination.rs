use regex::Regex;
use std::sync::LazyLock;

/// What a provider says about pages beyond the one just fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationHint {
    /// The provider reported how many pages exist in total
    TotalPages(u32),
    /// More pages exist but their count is unknown
    HasMore,
    /// This was the only (or last) page
    #[default]
    Exhausted,
}

static LAST_PAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"<[^>]*[?&]page=(\d+)[^>]*>;\s*rel="last""#).ok());

static NEXT_PAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"<[^>]*>;\s*rel="next""#).ok());

impl PaginationHint {
    /// Reads an RFC 8288 `Link` header. Without a parseable `rel="last"` the result is
    /// a single page, unless a `rel="next"` link says otherwise.
    pub fn from_link_header(link: Option<&str>) -> Self {
        let Some(link) = link else {
            return PaginationHint::Exhausted;
        };

        if let Some(total) = LAST_PAGE
            .as_ref()
            .and_then(|re| re.captures(link))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            return PaginationHint::TotalPages(total.max(1));
        }

        if NEXT_PAGE.as_ref().is_some_and(|re| re.is_match(link)) {
            PaginationHint::HasMore
        } else {
            PaginationHint::Exhausted
        }
    }

    /// Pages known to exist, counting the first one.
    pub fn total_pages(&self) -> Option<u32> {
        match self {
            PaginationHint::TotalPages(total) => Some(*total),
            PaginationHint::Exhausted => Some(1),
            PaginationHint::HasMore => None,
        }
    }
}
