//! Secondary indexes over the project collection.
//!
//! Both index kinds only ever narrow the candidate set. The filter is still
//! evaluated against every candidate, so an index may over-approximate but
//! must never miss a matching document.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// Exact-match index from a text key to document ids.
#[derive(Debug, Clone, Default)]
pub struct ValueIndex {
    entries: BTreeMap<String, BTreeSet<Uuid>>,
}

impl ValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, id: Uuid) {
        self.entries.entry(key.to_string()).or_default().insert(id);
    }

    pub fn remove(&mut self, key: &str, id: Uuid) {
        if let Some(ids) = self.entries.get_mut(key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    pub fn lookup(&self, key: &str) -> BTreeSet<Uuid> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn count(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, BTreeSet::len)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

type Trigram = [char; 3];

/// Case-insensitive trigram index for substring search.
#[derive(Debug, Clone, Default)]
pub struct TrigramIndex {
    postings: HashMap<Trigram, BTreeSet<Uuid>>,
    // trigrams per document, so removal does not need the old text
    by_document: HashMap<Uuid, Vec<Trigram>>,
}

impl TrigramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every text for `id`. Trigrams never span two texts.
    pub fn add<'a>(&mut self, id: Uuid, texts: impl IntoIterator<Item = &'a str>) {
        let mut grams: Vec<Trigram> = texts
            .into_iter()
            .flat_map(|text| trigrams(&text.to_lowercase()))
            .collect();
        grams.sort_unstable();
        grams.dedup();

        for gram in &grams {
            self.postings.entry(*gram).or_default().insert(id);
        }
        self.by_document.insert(id, grams);
    }

    pub fn remove(&mut self, id: Uuid) {
        let Some(grams) = self.by_document.remove(&id) else {
            return;
        };
        for gram in grams {
            if let Some(ids) = self.postings.get_mut(&gram) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.postings.remove(&gram);
                }
            }
        }
    }

    /// Documents that contain every trigram of `needle`.
    ///
    /// Returns `None` when the needle is too short to be indexed, meaning
    /// every document is a candidate.
    pub fn candidates(&self, needle: &str) -> Option<BTreeSet<Uuid>> {
        let grams = trigrams(&needle.to_lowercase());
        if grams.is_empty() {
            return None;
        }

        let mut sets: Vec<&BTreeSet<Uuid>> = Vec::with_capacity(grams.len());
        for gram in &grams {
            match self.postings.get(gram) {
                Some(ids) => sets.push(ids),
                None => return Some(BTreeSet::new()),
            }
        }
        sets.sort_by_key(|ids| ids.len());

        let (smallest, rest) = sets.split_first()?;
        Some(
            smallest
                .iter()
                .filter(|id| rest.iter().all(|ids| ids.contains(*id)))
                .copied()
                .collect(),
        )
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.by_document.clear();
    }
}

fn trigrams(text: &str) -> Vec<Trigram> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(3).map(|w| [w[0], w[1], w[2]]).collect()
}
