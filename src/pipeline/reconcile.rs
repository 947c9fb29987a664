//! Lemma reconciliation
//!
//! Every crawl task buffers one lemma record per lemma it sees on its page,
//! so a lemma found on N pages of a site arrives as N records. Before the
//! lemmas are written they are merged per `(site, lemma)` and the index
//! entries are repointed at the surviving record.

use crate::storage::{LemmaKey, PendingIndexEntry, PendingLemma};
use std::collections::HashMap;

/// Merges buffered lemma records that share a site and lemma text
///
/// The merged record keeps the key of the first record in its group and a
/// frequency equal to the group size. Groups keep the order in which their
/// first record appeared.
///
/// # Returns
///
/// The merged records and a map from every original key to its merged key
pub fn reconcile_lemmas(
    lemmas: Vec<PendingLemma>,
) -> (Vec<PendingLemma>, HashMap<LemmaKey, LemmaKey>) {
    let mut merged: Vec<PendingLemma> = Vec::new();
    let mut groups: HashMap<(i64, String), usize> = HashMap::new();
    let mut key_map = HashMap::with_capacity(lemmas.len());

    for record in lemmas {
        let group = (record.site_id, record.lemma.clone());
        match groups.get(&group) {
            Some(&index) => {
                let target = &mut merged[index];
                target.frequency += 1;
                key_map.insert(record.key, target.key);
            }
            None => {
                key_map.insert(record.key, record.key);
                groups.insert(group, merged.len());
                merged.push(PendingLemma {
                    frequency: 1,
                    id: None,
                    ..record
                });
            }
        }
    }

    (merged, key_map)
}

/// Points every entry at the merged lemma record for its original key
///
/// Entries whose key is missing from the map are left untouched.
pub fn repoint_entries(entries: &mut [PendingIndexEntry], key_map: &HashMap<LemmaKey, LemmaKey>) {
    for entry in entries.iter_mut() {
        if let Some(merged) = key_map.get(&entry.lemma_key) {
            entry.lemma_key = *merged;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PageKey;

    fn lemma(key: u64, site_id: i64, text: &str) -> PendingLemma {
        PendingLemma {
            key: LemmaKey(key),
            site_id,
            lemma: text.to_string(),
            frequency: 1,
            id: None,
        }
    }

    #[test]
    fn test_frequency_counts_pages() {
        // "кошка" appears on 3 of 5 pages, "дом" on all 5
        let mut records = Vec::new();
        let mut key = 0;
        for page in 0..5 {
            if page % 2 == 0 {
                records.push(lemma(key, 1, "кошка"));
                key += 1;
            }
            records.push(lemma(key, 1, "дом"));
            key += 1;
        }

        let (merged, key_map) = reconcile_lemmas(records);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].lemma, "кошка");
        assert_eq!(merged[0].frequency, 3);
        assert_eq!(merged[1].lemma, "дом");
        assert_eq!(merged[1].frequency, 5);
        assert_eq!(key_map.len(), 8);
    }

    #[test]
    fn test_same_lemma_on_different_sites_stays_apart() {
        let records = vec![lemma(0, 1, "кошка"), lemma(1, 2, "кошка")];

        let (merged, key_map) = reconcile_lemmas(records);

        assert_eq!(merged.len(), 2);
        assert_eq!(key_map[&LemmaKey(1)], LemmaKey(1));
    }

    #[test]
    fn test_repoint_entries() {
        let records = vec![lemma(0, 1, "кошка"), lemma(1, 1, "кошка"), lemma(2, 1, "дом")];
        let (_, key_map) = reconcile_lemmas(records);

        let mut entries = vec![
            PendingIndexEntry {
                page_key: PageKey(10),
                lemma_key: LemmaKey(1),
                rank: 2.0,
            },
            PendingIndexEntry {
                page_key: PageKey(11),
                lemma_key: LemmaKey(2),
                rank: 1.0,
            },
        ];
        repoint_entries(&mut entries, &key_map);

        assert_eq!(entries[0].lemma_key, LemmaKey(0));
        assert_eq!(entries[1].lemma_key, LemmaKey(2));
    }
}
