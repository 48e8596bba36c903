//! Keyed test associations collected from one test file.

use crate::types::TestAssociation;
use std::collections::{BTreeMap, HashMap};

/// Associations stored under one normalized key.
///
/// Most matchers append to `flat`; the HTTP-client matcher nests by verb
/// instead, so a route key can carry both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupEntry {
    pub flat: Vec<TestAssociation>,
    pub by_verb: BTreeMap<String, Vec<TestAssociation>>,
}

impl LookupEntry {
    /// Associations recorded for one HTTP verb
    pub fn for_verb(&self, verb: &str) -> &[TestAssociation] {
        self.by_verb
            .get(&verb.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every association under this key: flat ones first, then per verb
    pub fn all(&self) -> Vec<TestAssociation> {
        self.flat
            .iter()
            .chain(self.by_verb.values().flatten())
            .cloned()
            .collect()
    }

    /// Associations across all verbs, ignoring the flat list
    pub fn all_verbs(&self) -> Vec<TestAssociation> {
        self.by_verb.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty() && self.by_verb.values().all(Vec::is_empty)
    }
}

/// Case-folded key → associations, remembering key insertion order
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: HashMap<String, LookupEntry>,
    order: Vec<String>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, key: &str) -> &mut LookupEntry {
        let key = key.to_lowercase();
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.entry(key).or_default()
    }

    /// Append an association under a plain key
    pub fn push(&mut self, key: &str, association: TestAssociation) {
        if key.is_empty() {
            return;
        }
        self.entry_mut(key).flat.push(association);
    }

    /// Append an association under `[route][verb]`
    pub fn push_route(&mut self, route: &str, verb: &str, association: TestAssociation) {
        if route.is_empty() {
            return;
        }
        self.entry_mut(route)
            .by_verb
            .entry(verb.to_lowercase())
            .or_default()
            .push(association);
    }

    /// Entry for a key, case-folded before lookup
    pub fn get(&self, key: &str) -> Option<&LookupEntry> {
        self.entries.get(&key.to_lowercase())
    }

    /// Flat associations for a key, `None` when there are none
    pub fn flat(&self, key: &str) -> Option<&[TestAssociation]> {
        self.get(key)
            .map(|entry| entry.flat.as_slice())
            .filter(|flat| !flat.is_empty())
    }

    /// Entry that was inserted first
    pub fn first_entry(&self) -> Option<&LookupEntry> {
        self.order.first().and_then(|key| self.entries.get(key))
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Concatenate another table's associations into this one
    pub fn merge(&mut self, other: LookupTable) {
        let LookupTable { mut entries, order } = other;
        for key in order {
            let Some(incoming) = entries.remove(&key) else {
                continue;
            };
            let entry = self.entry_mut(&key);
            entry.flat.extend(incoming.flat);
            for (verb, associations) in incoming.by_verb {
                entry.by_verb.entry(verb).or_default().extend(associations);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assoc(case: &str) -> TestAssociation {
        TestAssociation::new(vec!["group".to_string(), case.to_string()], "a.test.js")
    }

    #[test]
    fn keys_are_case_folded() {
        let mut table = LookupTable::new();
        table.push("ListFiles", assoc("lists"));

        assert_eq!(table.flat("listfiles"), Some(&[assoc("lists")][..]));
        assert_eq!(table.flat("LISTFILES"), Some(&[assoc("lists")][..]));
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["listfiles"]);
    }

    #[test]
    fn routes_nest_by_verb() {
        let mut table = LookupTable::new();
        table.push_route("/hello", "GET", assoc("gets"));
        table.push_route("/hello", "post", assoc("posts"));

        let entry = table.get("/hello").unwrap();
        assert_eq!(entry.for_verb("get"), &[assoc("gets")]);
        assert_eq!(entry.for_verb("put"), &[] as &[TestAssociation]);
        assert_eq!(entry.all_verbs().len(), 2);
        assert!(table.flat("/hello").is_none());
    }

    #[test]
    fn merge_keeps_first_insertion_order() {
        let mut first = LookupTable::new();
        first.push("b", assoc("one"));

        let mut second = LookupTable::new();
        second.push("a", assoc("two"));
        second.push("b", assoc("three"));

        first.merge(second);
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(first.flat("b").unwrap().len(), 2);
        assert_eq!(first.first_entry().unwrap().flat[0], assoc("one"));
    }

    #[test]
    fn empty_keys_are_ignored() {
        let mut table = LookupTable::new();
        table.push("", assoc("nothing"));
        assert!(table.is_empty());
    }
}
