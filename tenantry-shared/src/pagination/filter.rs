/// Query-parameter filter builders
///
/// Each builder takes a column name (always a code-side constant) and the raw
/// query-string value, and returns `Some(Filter)` or `None` when the
/// parameter should not constrain the query.

use uuid::Uuid;

/// Case normalization applied before matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCase {
    Uppercase,
    Lowercase,
}

/// Options for [`filter_equal`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEqualOptions {
    pub case: Option<FilterCase>,
    pub trim: bool,
    /// Compare as a number when the value parses as one
    pub is_number: bool,
}

/// Options for [`filter_contain`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterContainOptions {
    pub case: Option<FilterCase>,
    pub trim: bool,
    /// Case-insensitive whole-value match instead of substring
    pub full_match: bool,
}

/// A single bound value
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Uuid(Uuid),
}

/// A bound list for `= ANY(...)`
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValues {
    Text(Vec<String>),
    Bool(Vec<bool>),
}

impl FilterValues {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValues::Text(v) => v.is_empty(),
            FilterValues::Bool(v) => v.is_empty(),
        }
    }
}

/// One `WHERE` condition
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field = value`
    Equal {
        field: &'static str,
        value: FilterValue,
    },

    /// `field ILIKE '%value%'`
    Contain { field: &'static str, value: String },

    /// `field ILIKE 'value'` (no wildcards)
    ContainFullMatch { field: &'static str, value: String },

    /// `field = ANY(values)`
    In {
        field: &'static str,
        values: FilterValues,
    },
}

impl Filter {
    pub fn field(&self) -> &'static str {
        match self {
            Filter::Equal { field, .. }
            | Filter::Contain { field, .. }
            | Filter::ContainFullMatch { field, .. }
            | Filter::In { field, .. } => field,
        }
    }
}

/// Conditions combined with `AND`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter; `None` is ignored so builders can be chained directly
    pub fn push(&mut self, filter: Option<Filter>) -> &mut Self {
        if let Some(filter) = filter {
            self.filters.push(filter);
        }
        self
    }

    pub fn with(mut self, filter: Option<Filter>) -> Self {
        self.push(filter);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }
}

/// Enums that can be filtered by their stored label
pub trait FilterEnum: Copy + PartialEq + 'static {
    const VARIANTS: &'static [Self];

    /// Label as stored in the database
    fn label(&self) -> &'static str;

    /// Case-insensitive label lookup
    fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.label().eq_ignore_ascii_case(raw))
    }
}

fn normalize(raw: Option<&str>, case: Option<FilterCase>, trim: bool) -> Option<String> {
    let raw = raw.filter(|v| !v.is_empty())?;

    let mut value = match case {
        Some(FilterCase::Uppercase) => raw.to_uppercase(),
        Some(FilterCase::Lowercase) => raw.to_lowercase(),
        None => raw.to_string(),
    };

    if trim {
        value = value.trim().to_string();
    }

    Some(value)
}

/// Exact match on a text or numeric column
pub fn filter_equal(
    field: &'static str,
    raw: Option<&str>,
    options: FilterEqualOptions,
) -> Option<Filter> {
    let value = normalize(raw, options.case, options.trim)?;

    let value = match value.parse::<f64>() {
        Ok(number) if options.is_number && number.is_finite() => FilterValue::Number(number),
        _ => FilterValue::Text(value),
    };

    Some(Filter::Equal { field, value })
}

/// Case-insensitive substring (or whole-value) match
pub fn filter_contain(
    field: &'static str,
    raw: Option<&str>,
    options: FilterContainOptions,
) -> Option<Filter> {
    let value = normalize(raw, options.case, options.trim)?;

    Some(if options.full_match {
        Filter::ContainFullMatch { field, value }
    } else {
        Filter::Contain { field, value }
    })
}

/// Comma-separated booleans, e.g. `isActive=true,false`
///
/// Every item other than `true` counts as `false`. Duplicates are dropped in
/// first-seen order. An absent parameter falls back to `default`; an empty
/// default means no filter.
pub fn filter_in_boolean(
    field: &'static str,
    raw: Option<&str>,
    default: &[bool],
) -> Option<Filter> {
    let values = match raw.filter(|v| !v.is_empty()) {
        Some(raw) => unique(raw.split(',').map(|item| item.trim() == "true")),
        None => default.to_vec(),
    };

    if values.is_empty() {
        return None;
    }

    Some(Filter::In {
        field,
        values: FilterValues::Bool(values),
    })
}

/// Exact match on an enum column
///
/// Unknown or missing values fall back to `default`; with no default there
/// is no filter.
pub fn filter_equal_enum<E: FilterEnum>(
    field: &'static str,
    raw: Option<&str>,
    default: Option<E>,
) -> Option<Filter> {
    let value = raw
        .filter(|v| !v.is_empty())
        .and_then(E::from_label)
        .or(default)?;

    Some(Filter::Equal {
        field,
        value: FilterValue::Text(value.label().to_string()),
    })
}

/// Comma-separated enum labels, unknown labels dropped
pub fn filter_in_enum<E: FilterEnum>(
    field: &'static str,
    raw: Option<&str>,
    default: &[E],
) -> Option<Filter> {
    let mut values = raw
        .map(|raw| unique(raw.split(',').filter_map(E::from_label)))
        .unwrap_or_default();

    if values.is_empty() {
        values = default.to_vec();
    }

    if values.is_empty() {
        return None;
    }

    Some(Filter::In {
        field,
        values: FilterValues::Text(values.iter().map(|v| v.label().to_string()).collect()),
    })
}

/// Equality on a foreign key, used for owner scoping
pub fn filter_owner(field: &'static str, owner: Uuid) -> Option<Filter> {
    Some(Filter::Equal {
        field,
        value: FilterValue::Uuid(owner),
    })
}

fn unique<T: PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
