// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Name search predicate shared by the listing and count queries.
//!
//! Each fragment is pushed together with its bound value, so the page query
//! and the count query always carry the same predicate.

use sqlx::{QueryBuilder, Sqlite};

use crate::domain::filter::Filter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePredicate {
    /// Case-insensitive equality
    Exact(String),
    /// Case-insensitive substring, matched literally
    Contains(String),
}

impl NamePredicate {
    pub fn from_filter(filter: &Filter) -> Option<Self> {
        let term = filter.search_term()?;
        Some(if filter.full_match {
            NamePredicate::Exact(term.to_string())
        } else {
            NamePredicate::Contains(term.to_string())
        })
    }

    /// Append ` AND <predicate>` on `column`
    pub fn push_to(&self, query: &mut QueryBuilder<'_, Sqlite>, column: &str) {
        match self {
            NamePredicate::Exact(term) => {
                query
                    .push(format!(" AND LOWER({column}) = LOWER("))
                    .push_bind(term.clone())
                    .push(")");
            }
            NamePredicate::Contains(term) => {
                query
                    .push(format!(" AND LOWER({column}) LIKE LOWER("))
                    .push_bind(format!("%{}%", escape_like(term)))
                    .push(") ESCAPE '\\'");
            }
        }
    }
}

/// Escape LIKE wildcards so user text is matched literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the filter's name predicate, if it has a search term
pub fn push_name_predicate(query: &mut QueryBuilder<'_, Sqlite>, filter: &Filter, column: &str) {
    if let Some(predicate) = NamePredicate::from_filter(filter) {
        predicate.push_to(query, column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_predicate_follows_match_mode() {
        let exact = Filter::default().with_search("Foo", true);
        assert_eq!(
            NamePredicate::from_filter(&exact),
            Some(NamePredicate::Exact("Foo".to_string()))
        );

        let partial = Filter::default().with_search("Foo", false);
        assert_eq!(
            NamePredicate::from_filter(&partial),
            Some(NamePredicate::Contains("Foo".to_string()))
        );

        assert_eq!(NamePredicate::from_filter(&Filter::default()), None);
    }

    #[test]
    fn test_push_name_predicate_sql() {
        let filter = Filter::default().with_search("Foo", false);
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM applications WHERE tenant_id = ");
        query.push_bind(1_i64);
        push_name_predicate(&mut query, &filter, "name");

        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM applications WHERE tenant_id = ? AND LOWER(name) LIKE LOWER(?) ESCAPE '\\'"
        );
    }

    #[test]
    fn test_no_predicate_without_search_term() {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT id FROM applications WHERE tenant_id = ");
        query.push_bind(1_i64);
        push_name_predicate(&mut query, &Filter::default(), "name");
        assert_eq!(query.sql(), "SELECT id FROM applications WHERE tenant_id = ?");
    }
}
