//! Prefix rewriting of schema references.
//!
//! A [`RewriteTable`] maps URI prefixes to replacement prefixes, e.g. a
//! public schema registry URL to a `file:` URL of a local mirror. The
//! [`ReferenceRewriter`] is the shareable handle resolvers hold on to.
//!
//! When more than one registered prefix matches a URI, the longest prefix
//! wins. Keys are unique, so the result never depends on registration order.
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RewriteTable {
    entries: IndexMap<String, String>,
}

impl RewriteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `prefix`. Returns the previous
    /// replacement if the prefix was already registered.
    pub fn register(&mut self, prefix: impl Into<String>, replacement: impl Into<String>) -> Option<String> {
        self.entries.insert(prefix.into(), replacement.into())
    }

    /// The matching entry with the longest prefix, if any.
    pub fn lookup(&self, uri: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .filter(|(prefix, _)| uri.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(p, r)| (p.as_str(), r.as_str()))
    }

    pub fn rewrite(&self, uri: &str) -> String {
        match self.lookup(uri) {
            Some((prefix, replacement)) => format!("{replacement}{}", &uri[prefix.len()..]),
            None => uri.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, r)| (p.as_str(), r.as_str()))
    }
}

static PROCESS_WIDE: Lazy<Arc<RwLock<RewriteTable>>> = Lazy::new(Default::default);

/// Cloneable handle over a rewrite table.
///
/// Registration goes through `&self` so a resolver and the session that
/// configures it can share one handle. Registration must finish before
/// generation starts; the lock only keeps the table sound, it does not
/// order registrations against concurrent lookups.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRewriter {
    table: Arc<RwLock<RewriteTable>>,
}

impl ReferenceRewriter {
    /// A rewriter over its own, initially empty, table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: RewriteTable) -> Self {
        Self { table: Arc::new(RwLock::new(table)) }
    }

    /// A rewriter over the table shared by the whole process. Every handle
    /// returned here sees every other handle's registrations, so concurrent
    /// sessions must register disjoint prefixes.
    pub fn process_wide() -> Self {
        Self { table: Arc::clone(&PROCESS_WIDE) }
    }

    pub fn register(&self, prefix: impl Into<String>, replacement: impl Into<String>) {
        let (prefix, replacement) = (prefix.into(), replacement.into());
        debug!(%prefix, %replacement, "registering reference rewrite");
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(prefix, replacement);
    }

    pub fn rewrite(&self, uri: &str) -> String {
        let rewritten = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rewrite(uri);
        if rewritten != uri {
            debug!(from = %uri, to = %rewritten, "rewrote reference");
        }
        rewritten
    }

    /// Copy of the current table.
    pub fn snapshot(&self) -> RewriteTable {
        self.table.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_prefix_is_replaced() {
        let rw = ReferenceRewriter::new();
        rw.register("https://example.org/schemas/", "file:///data/mySchemas/");
        assert_eq!(
            rw.rewrite("https://example.org/schemas/address.json"),
            "file:///data/mySchemas/address.json"
        );
    }

    #[test]
    fn unmatched_uri_passes_through() {
        let rw = ReferenceRewriter::new();
        assert_eq!(rw.rewrite("https://example.org/a.json"), "https://example.org/a.json");

        rw.register("https://example.org/schemas/", "file:///m/");
        assert_eq!(rw.rewrite("https://example.org/other/a.json"), "https://example.org/other/a.json");
        // prefix must lead, not merely occur
        assert_eq!(
            rw.rewrite("file:///x/https://example.org/schemas/a.json"),
            "file:///x/https://example.org/schemas/a.json"
        );
    }

    #[test]
    fn only_the_leading_occurrence_is_replaced() {
        let rw = ReferenceRewriter::new();
        rw.register("https://a.org/", "file:///m/");
        assert_eq!(
            rw.rewrite("https://a.org/nested/https://a.org/x.json"),
            "file:///m/nested/https://a.org/x.json"
        );
    }

    #[test]
    fn reregistering_a_prefix_overwrites_it() {
        let mut table = RewriteTable::new();
        assert_eq!(table.register("https://a.org/", "file:///one/"), None);
        assert_eq!(table.register("https://a.org/", "file:///two/"), Some("file:///one/".to_string()));
        assert_eq!(table.len(), 1);
        assert_eq!(table.rewrite("https://a.org/x.json"), "file:///two/x.json");
    }

    #[test]
    fn longest_prefix_wins_regardless_of_order() {
        for flip in [false, true] {
            let mut entries = vec![
                ("https://a.org/", "file:///short/"),
                ("https://a.org/schemas/v2/", "file:///long/"),
            ];
            if flip {
                entries.reverse();
            }
            let mut table = RewriteTable::new();
            for (p, r) in entries {
                table.register(p, r);
            }
            assert_eq!(table.rewrite("https://a.org/schemas/v2/x.json"), "file:///long/x.json");
            assert_eq!(table.rewrite("https://a.org/schemas/v1/x.json"), "file:///short/schemas/v1/x.json");
        }
    }

    #[test]
    fn independent_rewriters_do_not_share_entries() {
        let a = ReferenceRewriter::new();
        let b = ReferenceRewriter::new();
        a.register("https://a.org/", "file:///a/");
        assert!(b.is_empty());
        assert_eq!(b.rewrite("https://a.org/x.json"), "https://a.org/x.json");

        let a2 = a.clone();
        assert_eq!(a2.rewrite("https://a.org/x.json"), "file:///a/x.json");
    }

    #[test]
    fn process_wide_handles_share_one_table() {
        let prefix = "https://process-wide.test/rewrite-sharing/";
        ReferenceRewriter::process_wide().register(prefix, "file:///shared/");
        assert_eq!(
            ReferenceRewriter::process_wide().rewrite(&format!("{prefix}x.json")),
            "file:///shared/x.json"
        );
    }
}
