/// Pagination, ordering and filtering of list endpoints
///
/// List handlers receive raw query-string values and turn them into SQL in
/// three steps:
///
/// 1. [`PaginationOptions::resolve`] normalizes `page`, `perPage`, `orderBy`,
///    `orderDirection` and `search` against per-endpoint whitelists.
/// 2. The builders in [`filter`] turn individual query parameters into
///    [`filter::Filter`] values collected in a [`filter::FilterSet`].
/// 3. [`query`] appends the resulting `WHERE`, `ORDER BY` and `LIMIT/OFFSET`
///    clauses to a `sqlx::QueryBuilder`, binding every value.
///
/// # Example
///
/// ```
/// use tenantry_shared::pagination::{PaginationOptions, PaginationQuery};
///
/// let options = PaginationOptions::new(&["name", "key"], &["created_at", "name"]);
/// let list = options.resolve(&PaginationQuery {
///     page: Some("2".to_string()),
///     per_page: Some("500".to_string()),
///     order_by: Some("password".to_string()),
///     ..Default::default()
/// });
///
/// assert_eq!(list.per_page, 100);
/// assert_eq!(list.offset, 100);
/// assert_eq!(list.order_by, "created_at");
/// ```

pub mod filter;
pub mod query;

use serde::{Deserialize, Serialize};

/// Page size when none is requested
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Largest accepted page size
pub const MAX_PER_PAGE: i64 = 100;

/// First page
pub const DEFAULT_PAGE: i64 = 1;

/// Deepest reachable page; `totalPage` is capped at this too
pub const MAX_PAGE: i64 = 20;

/// Default sort column
pub const DEFAULT_ORDER_BY: &str = "created_at";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub const ALL: [OrderDirection; 2] = [OrderDirection::Asc, OrderDirection::Desc];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }

    /// SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }

    /// Case-insensitive parse of `asc` / `desc`
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

/// Raw pagination parameters as they arrive in the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
}

/// Per-endpoint pagination whitelist
#[derive(Debug, Clone)]
pub struct PaginationOptions {
    /// Columns matched by `search`
    pub available_search: &'static [&'static str],

    /// Columns accepted in `orderBy`
    pub available_order_by: &'static [&'static str],

    /// Fallback for a missing or unknown `orderBy`
    pub default_order_by: &'static str,

    /// Fallback for a missing or unknown `orderDirection`
    pub default_direction: OrderDirection,
}

impl PaginationOptions {
    pub fn new(
        available_search: &'static [&'static str],
        available_order_by: &'static [&'static str],
    ) -> Self {
        Self {
            available_search,
            available_order_by,
            default_order_by: DEFAULT_ORDER_BY,
            default_direction: OrderDirection::Asc,
        }
    }

    pub fn with_default_order(mut self, order_by: &'static str, direction: OrderDirection) -> Self {
        self.default_order_by = order_by;
        self.default_direction = direction;
        self
    }

    /// Normalizes raw parameters into a [`PaginationList`]
    ///
    /// Never fails: anything unusable falls back to a default, and
    /// out-of-range numbers are clamped.
    pub fn resolve(&self, query: &PaginationQuery) -> PaginationList {
        let per_page = parse_bounded(query.per_page.as_deref(), DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let page = parse_bounded(query.page.as_deref(), DEFAULT_PAGE, MAX_PAGE);

        let order_by = query
            .order_by
            .as_deref()
            .map(str::trim)
            .and_then(|requested| {
                self.available_order_by
                    .iter()
                    .copied()
                    .find(|column| *column == requested)
            })
            .unwrap_or(self.default_order_by);

        let order_direction = query
            .order_direction
            .as_deref()
            .and_then(OrderDirection::parse)
            .unwrap_or(self.default_direction);

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        PaginationList {
            search,
            page,
            per_page,
            offset: (page - 1) * per_page,
            order_by,
            order_direction,
            available_search: self.available_search,
            available_order_by: self.available_order_by,
        }
    }
}

fn parse_bounded(raw: Option<&str>, default: i64, max: i64) -> i64 {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(value) if value >= 1 => value.min(max),
        _ => default,
    }
}

/// Resolved pagination for one request
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationList {
    pub search: Option<String>,
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
    pub order_by: &'static str,
    pub order_direction: OrderDirection,
    pub available_search: &'static [&'static str],
    pub available_order_by: &'static [&'static str],
}

impl PaginationList {
    /// `ceil(total / per_page)`, capped at [`MAX_PAGE`]
    pub fn total_page(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        ((total + self.per_page - 1) / self.per_page).min(MAX_PAGE)
    }

    /// Echo of the resolved parameters for the response metadata
    pub fn meta(&self) -> PaginationMeta {
        PaginationMeta {
            search: self.search.clone(),
            page: self.page,
            per_page: self.per_page,
            order_by: self.order_by.to_string(),
            order_direction: self.order_direction,
            available_search: self.available_search.iter().map(|s| s.to_string()).collect(),
            available_order_by: self.available_order_by.iter().map(|s| s.to_string()).collect(),
            available_order_direction: OrderDirection::ALL.to_vec(),
        }
    }
}

/// `_metadata.pagination` in paged responses
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub search: Option<String>,
    pub page: i64,
    pub per_page: i64,
    pub order_by: String,
    pub order_direction: OrderDirection,
    pub available_search: Vec<String>,
    pub available_order_by: Vec<String>,
    pub available_order_direction: Vec<OrderDirection>,
}

/// `_pagination` in paged responses
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationTotals {
    pub total: i64,
    pub total_page: i64,
}
