//! PostgREST filter and query-string rendering.
//!
//! The store adapter only needs a small predicate vocabulary:
//! equality, `in (list)`, null checks, and prefix `like`. Each filter
//! renders to one `column=op.value` pair; a [`Query`] joins filters
//! with ordering and limit into the final query string.

use std::fmt::Write;

/// A single row predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact, case-sensitive equality: `column=eq.value`.
    Eq { column: String, value: String },
    /// Case-insensitive equality: `column=ilike.value` (no wildcard).
    EqFold { column: String, value: String },
    /// Membership in a list: `column=in.(a,b,c)`.
    In { column: String, values: Vec<String> },
    /// Null check: `column=is.null`.
    IsNull { column: String },
    /// Non-null check: `column=not.is.null`.
    NotNull { column: String },
    /// Prefix match: `column=like.prefix*`.
    LikePrefix { column: String, prefix: String },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn eq_fold(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EqFold {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn in_list(column: impl Into<String>, values: Vec<String>) -> Self {
        Self::In {
            column: column.into(),
            values,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull {
            column: column.into(),
        }
    }

    pub fn like_prefix(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::LikePrefix {
            column: column.into(),
            prefix: prefix.into(),
        }
    }

    /// Renders this filter as a `column=op.value` query pair.
    pub fn render(&self) -> String {
        match self {
            Self::Eq { column, value } => format!("{}=eq.{}", column, value),
            Self::EqFold { column, value } => format!("{}=ilike.{}", column, value),
            Self::In { column, values } => format!("{}=in.({})", column, values.join(",")),
            Self::IsNull { column } => format!("{}=is.null", column),
            Self::NotNull { column } => format!("{}=not.is.null", column),
            Self::LikePrefix { column, prefix } => format!("{}=like.{}*", column, prefix),
        }
    }
}

/// Result ordering on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A composed query: filters, optional ordering, optional limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            descending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Renders the full query string, without a leading `?`.
    ///
    /// Empty queries render to an empty string so callers can append
    /// unconditionally.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for filter in &self.filters {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(&filter.render());
        }
        if let Some(order) = &self.order {
            if !out.is_empty() {
                out.push('&');
            }
            let direction = if order.descending { "desc" } else { "asc" };
            let _ = write!(out, "order={}.{}", order.column, direction);
        }
        if let Some(limit) = self.limit {
            if !out.is_empty() {
                out.push('&');
            }
            let _ = write!(out, "limit={}", limit);
        }
        out
    }
}
