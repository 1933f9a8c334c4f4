/// SQL rendering of filters and pagination on top of `sqlx::QueryBuilder`
///
/// Column names are pushed verbatim and must come from code (filter builders
/// and [`PaginationOptions`](super::PaginationOptions) whitelists). Values are
/// always bound parameters.

use sqlx::{Postgres, QueryBuilder};

use super::filter::{Filter, FilterSet, FilterValue, FilterValues};
use super::PaginationList;

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends `WHERE ... AND ...` for the filters and the search term
///
/// The search term becomes one parenthesized `OR` group over the
/// pagination's searchable columns. Nothing is appended when there are no
/// conditions.
pub fn push_where(
    builder: &mut QueryBuilder<'_, Postgres>,
    filters: &FilterSet,
    pagination: Option<&PaginationList>,
) {
    let mut has_clause = false;

    for filter in filters.iter() {
        push_keyword(builder, &mut has_clause);
        push_filter(builder, filter);
    }

    if let Some(list) = pagination {
        if let Some(search) = list.search.as_deref() {
            if !list.available_search.is_empty() {
                push_keyword(builder, &mut has_clause);
                let pattern = format!("%{}%", escape_like(search));

                builder.push("(");
                for (i, column) in list.available_search.iter().enumerate() {
                    if i > 0 {
                        builder.push(" OR ");
                    }
                    builder.push(*column).push("::text ILIKE ");
                    builder.push_bind(pattern.clone());
                }
                builder.push(")");
            }
        }
    }
}

fn push_keyword(builder: &mut QueryBuilder<'_, Postgres>, has_clause: &mut bool) {
    builder.push(if *has_clause { " AND " } else { " WHERE " });
    *has_clause = true;
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::Equal { field, value } => match value {
            FilterValue::Text(text) => {
                builder.push(*field).push("::text = ");
                builder.push_bind(text.clone());
            }
            FilterValue::Number(number) => {
                builder.push(*field).push(" = ");
                builder.push_bind(*number);
            }
            FilterValue::Bool(flag) => {
                builder.push(*field).push(" = ");
                builder.push_bind(*flag);
            }
            FilterValue::Uuid(id) => {
                builder.push(*field).push(" = ");
                builder.push_bind(*id);
            }
        },
        Filter::Contain { field, value } => {
            builder.push(*field).push("::text ILIKE ");
            builder.push_bind(format!("%{}%", escape_like(value)));
        }
        Filter::ContainFullMatch { field, value } => {
            builder.push(*field).push("::text ILIKE ");
            builder.push_bind(escape_like(value));
        }
        Filter::In { values, .. } if values.is_empty() => {
            builder.push("FALSE");
        }
        Filter::In { field, values } => match values {
            FilterValues::Text(texts) => {
                builder.push(*field).push("::text = ANY(");
                builder.push_bind(texts.clone());
                builder.push(")");
            }
            FilterValues::Bool(flags) => {
                builder.push(*field).push(" = ANY(");
                builder.push_bind(flags.clone());
                builder.push(")");
            }
        },
    }
}

/// Appends `ORDER BY <column> <direction> LIMIT $n OFFSET $m`
///
/// A secondary `id` sort keeps pages stable when the primary column ties.
pub fn push_order_and_limit(builder: &mut QueryBuilder<'_, Postgres>, list: &PaginationList) {
    builder
        .push(" ORDER BY ")
        .push(list.order_by)
        .push(" ")
        .push(list.order_direction.as_sql())
        .push(", id ASC LIMIT ");
    builder.push_bind(list.per_page);
    builder.push(" OFFSET ");
    builder.push_bind(list.offset);
}
