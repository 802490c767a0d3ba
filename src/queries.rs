//! Query registry and builder
//!
//! The registry maps query names to `{filter, attributes}` pairs, populated
//! once at first use and read-only afterwards. Parameterized filters carry
//! `{key}` placeholders resolved by [`QueryBuilder`] before execution.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::catalog;
use crate::errors::{AdError, Result};

/// Presentational grouping for the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCategory {
    Basic,
    Admin,
    Kerberos,
    Delegation,
    AdCs,
    Permissions,
}

/// A named LDAP query: filter plus the attributes to project
#[derive(Debug, Clone)]
pub struct Query {
    /// LDAP filter condition
    pub filter: String,
    /// Attributes to return
    pub attributes: Vec<String>,
    /// Presentational category
    pub category: QueryCategory,
}

impl Query {
    pub fn new(
        filter: impl Into<String>,
        attributes: &[&str],
        category: QueryCategory,
    ) -> Self {
        Query {
            filter: filter.into(),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            category,
        }
    }
}

static REGISTRY: Lazy<HashMap<&'static str, Query>> = Lazy::new(|| {
    let mut queries = HashMap::new();
    catalog::register_basic(&mut queries);
    catalog::register_privileges(&mut queries);
    catalog::register_kerberos(&mut queries);
    catalog::register_delegation(&mut queries);
    catalog::register_certificates(&mut queries);
    catalog::register_domain_specific(&mut queries);
    queries
});

/// Retrieves a query by name
pub fn get(name: &str) -> Result<Query> {
    REGISTRY
        .get(name)
        .cloned()
        .ok_or_else(|| AdError::QueryNotFound(name.to_string()))
}

/// Returns a sorted list of all registered query names
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Returns the sorted names of queries in one category
pub fn names_in_category(category: QueryCategory) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY
        .iter()
        .filter(|(_, q)| q.category == category)
        .map(|(name, _)| *name)
        .collect();
    names.sort_unstable();
    names
}

/// Constructs concrete queries from a base query with parameter substitution
pub struct QueryBuilder {
    base: Query,
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    pub fn new(base: Query) -> Self {
        QueryBuilder {
            base,
            params: Vec::new(),
        }
    }

    /// Sets a parameter for `{key}` replacement
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Sets a parameter whose value is escaped per RFC 4515 first.
    ///
    /// Use this for values sourced from user input; DN-valued parameters
    /// like `{domain}` must stay unescaped.
    pub fn with_escaped_param(self, key: impl Into<String>, value: &str) -> Self {
        self.with_param(key, crate::escape::escape_ldap_filter(value))
    }

    /// Shorthand for the `{domain}` parameter used by domain-specific queries
    pub fn with_domain(self, base_dn: &str) -> Self {
        self.with_param("domain", base_dn)
    }

    /// Replaces the projected attributes
    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        if !attributes.is_empty() {
            self.base.attributes = attributes.iter().map(|s| s.to_string()).collect();
        }
        self
    }

    /// Produces the final query.
    ///
    /// Substitution is a single left-to-right pass per parameter; unresolved
    /// placeholders stay in the filter literally, which the server will
    /// reject as a syntax error.
    pub fn build(self) -> Query {
        let mut filter = self.base.filter;
        for (key, value) in &self.params {
            let placeholder = format!("{{{}}}", key);
            filter = filter.replace(&placeholder, value);
        }
        Query {
            filter,
            attributes: self.base.attributes,
            category: self.base.category,
        }
    }
}
