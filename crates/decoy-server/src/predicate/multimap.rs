//! Case-insensitive, regex-aware multi-valued map.
//!
//! `MatchingMap` models repeated headers, cookies and query/form parameters.
//! Keys are grouped by logical equivalence (case-insensitive equality or regex
//! match in either direction) rather than by literal string equality, and the
//! insertion order of both keys and values is preserved.

use super::token::Token;
use std::fmt;

/// Error raised when mutating a read-only map view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchingMapError {
    #[error("map entries are immutable; mutate the map through put/remove instead")]
    ImmutableEntry,
}

/// One logical key and all of its values.
#[derive(Debug, Clone, PartialEq)]
struct Group {
    key: Token,
    /// Empty once `remove_all` cleared the key: it stays structurally known.
    values: Vec<Token>,
}

impl Group {
    fn is_live(&self) -> bool {
        !self.values.is_empty()
    }
}

/// A single key/value pair produced by [`MatchingMap::entry_set`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    key: Token,
    value: Token,
}

impl Entry {
    pub fn new(key: impl Into<Token>, value: impl Into<Token>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &Token {
        &self.key
    }

    pub fn value(&self) -> &Token {
        &self.value
    }

    /// Entries cannot be changed in place; a single-pair mutation would break
    /// the key grouping of the map that produced them.
    pub fn set_value(&mut self, _value: impl Into<Token>) -> Result<Token, MatchingMapError> {
        Err(MatchingMapError::ImmutableEntry)
    }
}

/// Ordered multi-map from [`Token`] to [`Token`].
#[derive(Clone, Default, PartialEq)]
pub struct MatchingMap {
    groups: Vec<Group>,
}

impl MatchingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a logical key.
    ///
    /// A key with no live equivalent is added at the end of the key order.
    pub fn put(&mut self, key: impl Into<Token>, value: impl Into<Token>) {
        self.append(key.into(), value.into(), Token::equivalent);
    }

    /// Append a value received on the wire.
    ///
    /// Key and value are literals: keys group by case-insensitive equality
    /// only, so `a.c` and `abc` stay distinct.
    pub fn put_literal(&mut self, key: &str, value: &str) {
        self.append(Token::literal(key), Token::literal(value), Token::eq_ignore_case);
    }

    fn append(&mut self, key: Token, value: Token, same: impl Fn(&Token, &Token) -> bool) {
        if let Some(group) = self
            .groups
            .iter_mut()
            .find(|g| g.is_live() && same(&g.key, &key))
        {
            group.values.push(value);
            return;
        }
        self.groups.retain(|g| g.is_live() || !same(&g.key, &key));
        self.groups.push(Group {
            key,
            values: vec![value],
        });
    }

    /// Append several values under one key, in order.
    pub fn put_all_values<I, V>(&mut self, key: impl Into<Token>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Token>,
    {
        let key = key.into();
        for value in values {
            self.put(key.clone(), value);
        }
    }

    /// Merge a plain key/value association (one value per key).
    pub fn put_all<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Token>,
        V: Into<Token>,
    {
        for (key, value) in entries {
            self.put(key, value);
        }
    }

    /// Merge the entries of `other` whose keys are not already present.
    ///
    /// Existing keys keep their values untouched.
    pub fn put_values_for_new_keys(&mut self, other: &MatchingMap) {
        for group in other.groups.iter().filter(|g| g.is_live()) {
            if !self.contains_key(group.key.clone()) {
                self.put_all_values(group.key.clone(), group.values.iter().cloned());
            }
        }
    }

    /// First value of the first live key matching `key`.
    pub fn get(&self, key: impl Into<Token>) -> Option<&Token> {
        let key = key.into();
        self.groups
            .iter()
            .filter(|g| g.is_live() && g.key.equivalent(&key))
            .find_map(|g| g.values.first())
    }

    /// Every value of every key matching `key`, in insertion order.
    ///
    /// Returns `None` when no key matches at all, and an empty list when the
    /// only matching keys were emptied by [`MatchingMap::remove_all`].
    pub fn get_all(&self, key: impl Into<Token>) -> Option<Vec<Token>> {
        let key = key.into();
        let mut found = false;
        let mut values = Vec::new();
        for group in self.groups.iter().filter(|g| g.key.equivalent(&key)) {
            found = true;
            values.extend(group.values.iter().cloned());
        }
        found.then_some(values)
    }

    /// Remove and return the first value of the first matching key.
    ///
    /// The key is dropped entirely once its last value is removed.
    pub fn remove(&mut self, key: impl Into<Token>) -> Option<Token> {
        let key = key.into();
        let index = self
            .groups
            .iter()
            .position(|g| g.is_live() && g.key.equivalent(&key))?;
        let value = self.groups[index].values.remove(0);
        if self.groups[index].values.is_empty() {
            self.groups.remove(index);
        }
        Some(value)
    }

    /// Remove and return all values of every matching key.
    ///
    /// Returns `None` when nothing matched.
    pub fn remove_all(&mut self, key: impl Into<Token>) -> Option<Vec<Token>> {
        let key = key.into();
        let mut removed = Vec::new();
        for group in self
            .groups
            .iter_mut()
            .filter(|g| g.is_live() && g.key.equivalent(&key))
        {
            removed.append(&mut group.values);
        }
        if removed.is_empty() {
            None
        } else {
            Some(removed)
        }
    }

    pub fn contains_key(&self, key: impl Into<Token>) -> bool {
        let key = key.into();
        self.groups
            .iter()
            .any(|g| g.is_live() && g.key.equivalent(&key))
    }

    pub fn contains_value(&self, value: impl Into<Token>) -> bool {
        let value = value.into();
        self.groups
            .iter()
            .flat_map(|g| g.values.iter())
            .any(|v| v.equivalent(&value))
    }

    /// Distinct live keys, in insertion order.
    pub fn key_set(&self) -> Vec<Token> {
        self.live().map(|g| g.key.clone()).collect()
    }

    /// All values, grouped by key, in insertion order.
    pub fn values(&self) -> Vec<Token> {
        self.live().flat_map(|g| g.values.iter().cloned()).collect()
    }

    /// One entry per key/value pair.
    pub fn entry_set(&self) -> Vec<Entry> {
        self.live()
            .flat_map(|g| {
                g.values.iter().map(move |v| Entry {
                    key: g.key.clone(),
                    value: v.clone(),
                })
            })
            .collect()
    }

    /// Number of distinct logical keys.
    pub fn size(&self) -> usize {
        self.live().count()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Iterate live `(key, values)` groups.
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &[Token])> {
        self.live().map(|g| (&g.key, g.values.as_slice()))
    }

    fn live(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| g.is_live())
    }

    /// Check whether this (request-side) map satisfies every pair in `pattern`.
    ///
    /// - A negated pattern key requires that no key here matches it.
    /// - A negated pattern value requires that no value under the matching
    ///   keys matches it; the key itself must still be present.
    /// - Keys absent from the pattern are not constrained.
    pub fn contains_all(&self, pattern: &MatchingMap) -> bool {
        pattern.live().all(|expected| self.satisfies(expected))
    }

    fn satisfies(&self, expected: &Group) -> bool {
        if expected.key.is_negated() {
            return !self
                .live()
                .any(|g| expected.key.matches_value(g.key.value()));
        }

        let candidates: Vec<&Token> = self
            .live()
            .filter(|g| expected.key.matches_value(g.key.value()))
            .flat_map(|g| g.values.iter())
            .collect();
        if candidates.is_empty() {
            return false;
        }

        expected.values.iter().all(|pattern| {
            let any = candidates.iter().any(|v| pattern.matches_value(v.value()));
            if pattern.is_negated() {
                !any
            } else {
                any
            }
        })
    }
}

impl fmt::Debug for MatchingMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.live().map(|g| (&g.key, &g.values)))
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for MatchingMap
where
    K: Into<Token>,
    V: Into<Token>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MatchingMap::new();
        map.put_all(iter);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::token::strings;
    use std::collections::BTreeMap;

    fn sample() -> MatchingMap {
        let mut map = MatchingMap::new();
        map.put("one", "one_one");
        map.put("one", "one_two");
        map.put("one", "one_three");
        map.put("two", "two");
        map
    }

    fn assert_one_group(map: &MatchingMap, expected: &[&str]) {
        for key in ["o[a-z]{2}", "one", "ONE", "One", "oNE"] {
            assert_eq!(map.get_all(key), Some(strings(expected.iter().copied())), "key {key}");
        }
        assert_eq!(map.get_all("two"), Some(strings(["two"])));
        assert_eq!(map.get_all("TWO"), Some(strings(["two"])));
    }

    #[test]
    fn test_store_multiple_values_against_single_key() {
        let map = sample();

        assert_eq!(
            map.get_all("[a-z]{3}"),
            Some(strings(["one_one", "one_two", "one_three", "two"]))
        );
        assert_one_group(&map, &["one_one", "one_two", "one_three"]);
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_put_all_plain_map() {
        let mut map = MatchingMap::new();
        map.put("one", "one_one");
        let mut plain = BTreeMap::new();
        plain.insert("one", "one_two");
        plain.insert("two", "two");
        map.put_all(plain);
        map.put("one", "one_three");

        assert_eq!(
            map.get_all("[a-z]{3}"),
            Some(strings(["one_one", "one_two", "one_three", "two"]))
        );
        assert_one_group(&map, &["one_one", "one_two", "one_three"]);
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_put_values_for_new_keys_only() {
        let mut map = MatchingMap::new();
        map.put("one", "one_one");
        let mut other = MatchingMap::new();
        other.put("one", "one_two");
        other.put("two", "two");
        map.put_values_for_new_keys(&other);
        map.put("one", "one_three");

        assert_eq!(
            map.get_all("[a-z]{3}"),
            Some(strings(["one_one", "one_three", "two"]))
        );
        assert_one_group(&map, &["one_one", "one_three"]);
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_put_values_for_new_keys_adds_unseen_key() {
        let mut map = sample();
        let mut other = MatchingMap::new();
        other.put("ONE", "ignored");
        other.put("three", "three_one");
        other.put("three", "three_two");
        map.put_values_for_new_keys(&other);

        assert_eq!(
            map.get_all("one"),
            Some(strings(["one_one", "one_two", "one_three"]))
        );
        assert_eq!(map.get_all("three"), Some(strings(["three_one", "three_two"])));
        assert_eq!(map.size(), 3);
    }

    #[test]
    fn test_put_list_of_values() {
        let mut map = MatchingMap::new();
        map.put_all_values("one", ["one_one"]);
        map.put_all_values("one", ["one_two", "one_three"]);

        assert_eq!(
            map.get_all("[a-z]{3}"),
            Some(strings(["one_one", "one_two", "one_three"]))
        );
        assert_one_group(&map, &["one_one", "one_two", "one_three"]);
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn test_empty_and_clear() {
        assert!(MatchingMap::new().is_empty());

        let mut map = sample();
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains_key("one"));
        assert!(!map.contains_key("two"));
        assert!(!map.contains_value("one_two"));
        assert!(!map.contains_value("two"));
        assert_eq!(map.size(), 0);
        assert_eq!(map.get_all("one"), None);
    }

    #[test]
    fn test_entry_set() {
        let map = sample();
        assert_eq!(
            map.entry_set(),
            vec![
                Entry::new("one", "one_one"),
                Entry::new("one", "one_two"),
                Entry::new("one", "one_three"),
                Entry::new("two", "two"),
            ]
        );
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_entry_accessors() {
        let entry = Entry::new("key", "value");
        assert_eq!(entry.key(), &Token::new("key"));
        assert_eq!(entry.value(), &Token::new("value"));
    }

    #[test]
    fn test_entry_rejects_mutation() {
        let mut entry = Entry::new("key", "value");
        assert_eq!(
            entry.set_value("new_value"),
            Err(MatchingMapError::ImmutableEntry)
        );
        assert_eq!(entry.value(), &Token::new("value"));
    }

    #[test]
    fn test_read_views_are_idempotent() {
        let map = sample();
        assert_eq!(map.values(), map.values());
        assert_eq!(map.key_set(), map.key_set());
        assert_eq!(map.entry_set(), map.entry_set());
    }

    fn assert_after_remove_all(map: &MatchingMap) {
        assert_eq!(map.size(), 1);
        assert!(!map.contains_key("one"));
        assert!(map.contains_key("two"));
        assert_eq!(map.key_set(), strings(["two"]));
        assert!(!map.contains_value("one_one"));
        assert!(!map.contains_value("one_two"));
        assert!(!map.contains_value("one_three"));
        assert!(map.contains_value("two"));
        assert_eq!(map.values(), strings(["two"]));
        assert_eq!(map.get("one"), None);
        assert_eq!(map.get("two"), Some(&Token::new("two")));
        assert_eq!(map.get_all("one"), Some(vec![]));
        assert_eq!(map.get_all("two"), Some(strings(["two"])));
    }

    #[test]
    fn test_remove_all_values() {
        let mut map = sample();
        assert_eq!(
            map.remove_all("one"),
            Some(strings(["one_one", "one_two", "one_three"]))
        );
        assert_eq!(map.remove_all("three"), None);
        assert_after_remove_all(&map);
    }

    #[test]
    fn test_remove_all_values_with_regex() {
        let mut map = sample();
        assert_eq!(
            map.remove_all("o[a-z]{2}"),
            Some(strings(["one_one", "one_two", "one_three"]))
        );
        assert_eq!(map.remove_all("t[a-z]{3}"), None);
        assert_after_remove_all(&map);
    }

    #[test]
    fn test_remove_all_values_case_insensitive() {
        let mut map = sample();
        assert_eq!(
            map.remove_all("ONE"),
            Some(strings(["one_one", "one_two", "one_three"]))
        );
        assert_eq!(map.remove_all("three"), None);
        assert_after_remove_all(&map);
    }

    #[test]
    fn test_remove_all_twice_returns_none() {
        let mut map = sample();
        assert!(map.remove_all("one").is_some());
        assert_eq!(map.remove_all("one"), None);
    }

    #[test]
    fn test_put_after_remove_all_repopulates_key() {
        let mut map = sample();
        map.remove_all("one");
        map.put("ONE", "again");
        assert_eq!(map.get_all("one"), Some(strings(["again"])));
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_put_after_remove_all_appends_key_at_end() {
        let mut map = sample();
        map.remove_all("one");
        map.put("ONE", "again");

        assert_eq!(map.key_set(), strings(["two", "ONE"]));
        assert_eq!(map.values(), strings(["two", "again"]));
        assert_eq!(map.key_set()[1].value(), "ONE");
    }

    #[test]
    fn test_put_literal_keeps_metacharacter_keys_apart() {
        let mut map = MatchingMap::new();
        map.put_literal("a.c", "1");
        map.put_literal("abc", "2");
        map.put_literal("ABC", "3");

        assert_eq!(map.size(), 2);
        assert_eq!(map.key_set(), strings(["a.c", "abc"]));
        assert_eq!(map.get_all("abc"), Some(strings(["2", "3"])));

        // Regex grouping would have merged both keys under `a.c`
        let mut grouped = MatchingMap::new();
        grouped.put("a.c", "1");
        grouped.put("abc", "2");
        assert_eq!(grouped.size(), 1);
    }

    #[test]
    fn test_contains_all_with_metacharacter_keys() {
        let mut request = MatchingMap::new();
        request.put_literal("a.c", "1");
        request.put_literal("abc", "2");
        request.put_literal("x-a_b", "two");

        let mut pattern = MatchingMap::new();
        pattern.put("abc", "2");
        assert!(request.contains_all(&pattern));

        let mut pattern = MatchingMap::new();
        pattern.put("x-a_b", "two");
        assert!(request.contains_all(&pattern));

        // A regex key in the pattern still spans every literal it matches
        let mut pattern = MatchingMap::new();
        pattern.put("a.c", "2");
        assert!(request.contains_all(&pattern));

        let mut pattern = MatchingMap::new();
        pattern.put("a\\.c", "2");
        assert!(!request.contains_all(&pattern));
    }

    fn assert_after_remove(map: &MatchingMap) {
        assert_eq!(map.size(), 2);
        assert!(!map.contains_value("one_one"));
        assert!(map.contains_value("one_two"));
        assert!(map.contains_value("one_three"));
        assert!(map.contains_value("two"));
        assert_eq!(map.key_set(), strings(["one", "two"]));
        assert_eq!(map.values(), strings(["one_two", "one_three", "two"]));
        assert_eq!(map.get_all("one"), Some(strings(["one_two", "one_three"])));
        assert_eq!(map.get_all("two"), Some(strings(["two"])));
    }

    #[test]
    fn test_remove_a_value() {
        let mut map = sample();
        assert_eq!(map.remove("one"), Some(Token::new("one_one")));
        assert_eq!(map.remove("three"), None);

        assert_after_remove(&map);
        assert!(map.contains_key("one"));
        assert!(map.contains_key("two"));
        assert_eq!(map.get("one"), Some(&Token::new("one_two")));
        assert_eq!(map.get("two"), Some(&Token::new("two")));
    }

    #[test]
    fn test_remove_a_value_with_regex() {
        let mut map = sample();
        assert_eq!(map.remove("o[a-z]{2}"), Some(Token::new("one_one")));
        assert_eq!(map.remove("t[a-z]{3}"), None);

        assert_after_remove(&map);
        assert!(map.contains_key("o.*"));
        assert!(map.contains_key("T[a-z]{2}"));
        assert_eq!(map.get(".*n.*"), Some(&Token::new("one_two")));
        assert_eq!(map.get(".*o"), Some(&Token::new("two")));
    }

    #[test]
    fn test_remove_a_value_case_insensitive() {
        let mut map = sample();
        assert_eq!(map.remove("ONE"), Some(Token::new("one_one")));
        assert_eq!(map.remove("three"), None);

        assert_after_remove(&map);
        assert!(map.contains_key("oNE"));
        assert!(map.contains_key("Two"));
        assert_eq!(map.get("oNe"), Some(&Token::new("one_two")));
        assert_eq!(map.get("twO"), Some(&Token::new("two")));
    }

    #[test]
    fn test_remove_last_value_drops_key() {
        let mut map = sample();
        assert_eq!(map.remove("two"), Some(Token::new("two")));
        assert!(!map.contains_key("two"));
        assert_eq!(map.get_all("two"), None);
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn test_contains_all_requires_each_pattern_pair() {
        let request: MatchingMap = [
            ("Content-Type", "application/json"),
            ("Accept", "text/html"),
            ("Accept", "application/xml"),
        ]
        .into_iter()
        .collect();

        let pattern: MatchingMap = [("content-type", "application/.*")].into_iter().collect();
        assert!(request.contains_all(&pattern));

        let pattern: MatchingMap = [("ACCEPT", "application/xml")].into_iter().collect();
        assert!(request.contains_all(&pattern));

        let pattern: MatchingMap = [("Accept", "image/png")].into_iter().collect();
        assert!(!request.contains_all(&pattern));

        let pattern: MatchingMap = [("X-Missing", ".*")].into_iter().collect();
        assert!(!request.contains_all(&pattern));

        assert!(request.contains_all(&MatchingMap::new()));
    }

    #[test]
    fn test_contains_all_negated_key() {
        let request: MatchingMap = [("Authorization", "Bearer x")].into_iter().collect();

        let mut pattern = MatchingMap::new();
        pattern.put(Token::not("X-Debug"), Token::new(".*"));
        assert!(request.contains_all(&pattern));

        let mut pattern = MatchingMap::new();
        pattern.put(Token::not("authorization"), Token::new(".*"));
        assert!(!request.contains_all(&pattern));
    }

    #[test]
    fn test_contains_all_negated_value() {
        let request: MatchingMap = [("Accept", "text/html"), ("Accept", "text/plain")]
            .into_iter()
            .collect();

        let mut pattern = MatchingMap::new();
        pattern.put("accept", Token::not("application/json"));
        assert!(request.contains_all(&pattern));

        let mut pattern = MatchingMap::new();
        pattern.put("accept", Token::not("text/.*"));
        assert!(!request.contains_all(&pattern));

        // Negated value still needs the key to be present
        let mut pattern = MatchingMap::new();
        pattern.put("x-trace", Token::not("off"));
        assert!(!request.contains_all(&pattern));
    }
}
