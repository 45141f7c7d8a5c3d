use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// One bucket of a frequency distribution
///
/// `label` is the bucket identity used for merging and sorting. `id` comes
/// from the catalog (0 when the bucket has no relational key, e.g. dates) and
/// is only unique within a single distribution kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub id: i64,
    pub label: String,
    pub count: i64,
}

impl DistributionEntry {
    pub fn new(id: i64, label: impl Into<String>, count: i64) -> Self {
        DistributionEntry {
            id,
            label: label.into(),
            count,
        }
    }
}

/// Ordered sequence of distribution buckets
///
/// Labels are not required to be unique here; raw query results keep
/// whatever rows the query produced, in the query's order. Uniqueness only
/// holds after [`DistributionList::to_map`], [`DistributionList::coalesce`]
/// or a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributionList(Vec<DistributionEntry>);

/// Buckets keyed by label. Transient; only lists leave the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionMap(HashMap<String, DistributionEntry>);

impl DistributionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DistributionEntry) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DistributionEntry> {
        self.0.iter()
    }

    pub fn entries(&self) -> &[DistributionEntry] {
        &self.0
    }

    pub fn into_entries(self) -> Vec<DistributionEntry> {
        self.0
    }

    /// Sum of all bucket counts
    pub fn total(&self) -> i64 {
        self.0
            .iter()
            .fold(0i64, |acc, entry| acc.saturating_add(entry.count))
    }

    /// Look up a bucket by label (first match)
    pub fn get(&self, label: &str) -> Option<&DistributionEntry> {
        self.0.iter().find(|entry| entry.label == label)
    }

    /// Build a label-keyed map
    ///
    /// Duplicate labels are accumulated: counts are summed and the `id` of
    /// the first occurrence is kept. Nothing is dropped.
    pub fn to_map(&self) -> DistributionMap {
        let mut map = DistributionMap::new();
        for entry in &self.0 {
            map.accumulate(entry);
        }
        map
    }

    /// Merge `others` into this list, see [`merge_distributions`]
    ///
    /// This list's entries are visited first, so its ids win on collision.
    pub fn merge(&self, others: &[DistributionList]) -> DistributionList {
        merge_distributions(std::iter::once(self).chain(others.iter()))
    }

    /// Collapse duplicate labels while keeping first-seen order
    ///
    /// Used where a converter maps several raw values onto one display label
    /// (e.g. two APEX codes that both render as f/5.6) and the query's order
    /// must survive.
    pub fn coalesce(self) -> DistributionList {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut collapsed: Vec<DistributionEntry> = Vec::with_capacity(self.0.len());

        for entry in self.0 {
            match positions.get(&entry.label) {
                Some(&index) => {
                    let target = &mut collapsed[index];
                    target.count = target.count.saturating_add(entry.count);
                }
                None => {
                    positions.insert(entry.label.clone(), collapsed.len());
                    collapsed.push(entry);
                }
            }
        }

        DistributionList(collapsed)
    }

    /// Sort ascending by label (plain string order, stable)
    pub fn sort_by_label(&mut self) {
        self.0.sort_by(|a, b| a.label.cmp(&b.label));
    }

    /// Sort date buckets chronologically
    ///
    /// Date labels are `YYYY-MM-DD`, which sorts chronologically under string
    /// order, so this is the label ordering under another name.
    pub fn sort_by_date(&mut self) {
        self.sort_by_label();
    }
}

impl DistributionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&DistributionEntry> {
        self.0.get(label)
    }

    /// Add an entry's count to its label's bucket, copying the entry if the
    /// label is new
    pub fn accumulate(&mut self, entry: &DistributionEntry) {
        match self.0.entry(entry.label.clone()) {
            Entry::Occupied(mut existing) => {
                let target = existing.get_mut();
                target.count = target.count.saturating_add(entry.count);
            }
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
            }
        }
    }

    /// Flatten to a list. Order is unspecified; sort before relying on it.
    pub fn to_list(&self) -> DistributionList {
        self.0.values().cloned().collect()
    }

    pub fn into_list(self) -> DistributionList {
        self.0.into_values().collect()
    }
}

/// Combine any number of distributions into one
///
/// Counts of entries sharing a label are summed across every input; `id` and
/// `label` come from the first occurrence visited. The result is sorted
/// ascending by label, so the totals do not depend on input order. No inputs
/// yields an empty list.
pub fn merge_distributions<'a, I>(lists: I) -> DistributionList
where
    I: IntoIterator<Item = &'a DistributionList>,
{
    let mut merged = DistributionMap::new();
    for list in lists {
        for entry in list.iter() {
            merged.accumulate(entry);
        }
    }

    let mut list = merged.into_list();
    list.sort_by_label();
    list
}

impl From<Vec<DistributionEntry>> for DistributionList {
    fn from(entries: Vec<DistributionEntry>) -> Self {
        DistributionList(entries)
    }
}

impl FromIterator<DistributionEntry> for DistributionList {
    fn from_iter<T: IntoIterator<Item = DistributionEntry>>(iter: T) -> Self {
        DistributionList(iter.into_iter().collect())
    }
}

impl IntoIterator for DistributionList {
    type Item = DistributionEntry;
    type IntoIter = std::vec::IntoIter<DistributionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DistributionList {
    type Item = &'a DistributionEntry;
    type IntoIter = std::slice::Iter<'a, DistributionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[(i64, &str, i64)]) -> DistributionList {
        entries
            .iter()
            .map(|(id, label, count)| DistributionEntry::new(*id, *label, *count))
            .collect()
    }

    fn counts(list: &DistributionList) -> Vec<(String, i64)> {
        list.iter().map(|e| (e.label.clone(), e.count)).collect()
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = list(&[(1, "A", 1)]);
        let b = list(&[(1, "A", 2), (2, "B", 3)]);

        let ab = merge_distributions([&a, &b]);
        let ba = merge_distributions([&b, &a]);

        let expected = vec![("A".to_string(), 3), ("B".to_string(), 3)];
        assert_eq!(counts(&ab), expected);
        assert_eq!(counts(&ba), expected);
    }

    #[test]
    fn test_merge_is_associative() {
        let a = list(&[(0, "A", 1), (0, "B", 2)]);
        let b = list(&[(0, "B", 3)]);
        let c = list(&[(0, "C", 4), (0, "A", 5)]);

        let left = merge_distributions([&merge_distributions([&a, &b]), &c]);
        let right = merge_distributions([&a, &merge_distributions([&b, &c])]);

        assert_eq!(counts(&left), counts(&right));
        assert_eq!(
            counts(&left),
            vec![
                ("A".to_string(), 6),
                ("B".to_string(), 5),
                ("C".to_string(), 4)
            ]
        );
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = merge_distributions(std::iter::empty::<&DistributionList>());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_with_itself_sums_counts_keeps_id() {
        let a = list(&[(7, "Canon", 2), (9, "Nikon", 1)]);
        let merged = a.merge(&[a.clone()]);

        assert_eq!(merged.entries(), list(&[(7, "Canon", 4), (9, "Nikon", 2)]).entries());
    }

    #[test]
    fn test_merge_keeps_first_seen_id() {
        let a = list(&[(1, "X", 1)]);
        let b = list(&[(2, "X", 1)]);

        assert_eq!(merge_distributions([&a, &b]).get("X").unwrap().id, 1);
        assert_eq!(merge_distributions([&b, &a]).get("X").unwrap().id, 2);
    }

    #[test]
    fn test_merge_sorts_by_label() {
        let a = list(&[(0, "b", 1), (0, "C", 1), (0, "a", 1)]);
        let labels: Vec<String> = merge_distributions([&a])
            .into_iter()
            .map(|e| e.label)
            .collect();
        assert_eq!(labels, vec!["C", "a", "b"]);
    }

    #[test]
    fn test_to_map_accumulates_duplicates() {
        let raw = list(&[(3, "50", 2), (4, "50", 5), (5, "85", 1)]);
        let map = raw.to_map();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("50"), Some(&DistributionEntry::new(3, "50", 7)));
        assert_eq!(map.get("85"), Some(&DistributionEntry::new(5, "85", 1)));
    }

    #[test]
    fn test_map_round_trip_preserves_entries() {
        let raw = list(&[(1, "b", 2), (2, "a", 3)]);
        let mut back = raw.to_map().to_list();
        back.sort_by_label();
        assert_eq!(back, list(&[(2, "a", 3), (1, "b", 2)]));
    }

    #[test]
    fn test_coalesce_preserves_first_seen_order() {
        let raw = list(&[(0, "5.6", 1), (0, "2.8", 4), (0, "5.6", 2), (0, "8.0", 1)]);
        let collapsed = raw.coalesce();
        assert_eq!(
            counts(&collapsed),
            vec![
                ("5.6".to_string(), 3),
                ("2.8".to_string(), 4),
                ("8.0".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_sort_by_date() {
        let mut dates = list(&[(0, "2021-01-10", 1), (0, "2020-12-31", 2), (0, "2021-01-02", 3)]);
        dates.sort_by_date();
        let labels: Vec<&str> = dates.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["2020-12-31", "2021-01-02", "2021-01-10"]);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let a = list(&[(1, "X", 2)]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, r#"[{"id":1,"label":"X","count":2}]"#);
    }
}
