//! # Query Building
//!
//! Typed filter, sort and expansion values that render to the record
//! store's expression syntax, e.g. `(author = "u1") || (community = "c1")`.
//! The store evaluates the rendered string; adapters may also walk the tree.

use std::fmt;

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Bool(bool),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for Literal {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field = value`
    Eq(String, Literal),
    /// `field ~ value`: substring match on text fields, membership on
    /// multi-relation fields.
    Contains(String, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains(field.into(), needle.into())
    }

    /// Disjunction; a single operand is returned as is.
    pub fn any(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Self::Or(filters)
        }
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::And(parts) | Self::Or(parts) if parts.len() > 1)
    }

    fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Filter], op: &str) -> fmt::Result {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                write!(f, " {op} ")?;
            }
            if part.is_compound() {
                write!(f, "({part})")?;
            } else {
                write!(f, "{part}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(field, value) => write!(f, "{field} = {value}"),
            Self::Contains(field, needle) => {
                write!(f, "{field} ~ {}", Literal::Str(needle.clone()))
            }
            Self::And(parts) => Self::write_joined(f, parts, "&&"),
            Self::Or(parts) => Self::write_joined(f, parts, "||"),
        }
    }
}

/// One sort key; rendered as `field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: false }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: true }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// Relation paths to expand, e.g. `author,original_post.author`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expand(Vec<String>);

impl Expand {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    /// Enough to unroll one level of reposts.
    pub fn post_with_original() -> Self {
        Self::paths(["author", "original_post", "original_post.author"])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Expand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u32,
    pub per_page: u32,
}

/// Parameters of a list call. Without `paging` every matching record is
/// returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: Option<Filter>,
    pub sort: Vec<Sort>,
    pub expand: Expand,
    pub paging: Option<Paging>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand = expand;
        self
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.paging = Some(Paging { page, per_page });
        self
    }

    /// The rendered sort expression, e.g. `-created,id`.
    pub fn sort_expr(&self) -> String {
        self.sort.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of matching records across all pages
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_of_groups_is_parenthesized() {
        let following = Filter::any(vec![Filter::eq("author", "b1"), Filter::eq("author", "b2")]);
        let joined = Filter::eq("community", "c1");
        let filter = Filter::any(vec![following, joined]);
        assert_eq!(filter.to_string(), r#"(author = "b1" || author = "b2") || community = "c1""#);
    }

    #[test]
    fn test_values_are_escaped() {
        let filter = Filter::contains("content", r#"say "hi""#);
        assert_eq!(filter.to_string(), r#"content ~ "say \"hi\"""#);
    }

    #[test]
    fn test_single_operand_collapses() {
        assert_eq!(Filter::any(vec![Filter::eq("private", false)]), Filter::eq("private", false));
        assert_eq!(Filter::eq("private", false).to_string(), "private = false");
    }

    #[test]
    fn test_and_chains_flatten() {
        let filter = Filter::eq("post", "p1").and(Filter::eq("user", "u1")).and(Filter::eq("type", "like"));
        assert_eq!(filter.to_string(), r#"post = "p1" && user = "u1" && type = "like""#);
    }

    #[test]
    fn test_sort_and_expand_rendering() {
        let query = ListQuery::new()
            .sort(Sort::desc("created"))
            .sort(Sort::asc("id"))
            .expand(Expand::post_with_original());
        assert_eq!(query.sort_expr(), "-created,id");
        assert_eq!(query.expand.to_string(), "author,original_post,original_post.author");
    }
}
