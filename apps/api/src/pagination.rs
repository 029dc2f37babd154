use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
/// Keeps `page * limit` far from overflow; anything beyond is an empty page.
pub const MAX_PAGE: i64 = 1_000_000;

/// `?page=&limit=`; out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// `?limit=` for the unpaginated listings, capped at 50.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    pub fn or_default(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, 50)
    }
}

/// Catalog pagination block. The total is keyed per collection, e.g.
/// `totalCareers` or `totalPaths`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
    total_key: &'static str,
}

impl Pagination {
    pub fn new(query: &PageQuery, total: i64, total_key: &'static str) -> Self {
        let limit = query.limit();
        Self {
            current_page: query.page(),
            total_pages: (total + limit - 1) / limit,
            total,
            has_next: query.offset().saturating_add(limit) < total,
            has_prev: query.page() > 1,
            total_key,
        }
    }
}

impl Serialize for Pagination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("currentPage", &self.current_page)?;
        map.serialize_entry("totalPages", &self.total_pages)?;
        map.serialize_entry(self.total_key, &self.total)?;
        map.serialize_entry("hasNext", &self.has_next)?;
        map.serialize_entry("hasPrev", &self.has_prev)?;
        map.end()
    }
}
