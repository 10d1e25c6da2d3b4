//! Word-frequency table for auto-complete.

use crate::config::SuggestionsConfig;
use crate::document::Language;
use crate::text;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One auto-complete candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Suggestion {
    pub word: String,
    pub language: Language,
    pub frequency: u64,
}

/// Counts words per language while records stream past.
#[derive(Debug, Default)]
pub struct WordFrequency {
    counts: HashMap<Language, HashMap<String, u64>>,
}

impl WordFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the words of one cleaned text.
    pub fn add(&mut self, language: Language, clean_text: &str) {
        let counts = self.counts.entry(language).or_default();
        for word in text::extract_words(clean_text) {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    /// Fold another set of counts into this one.
    pub fn merge(&mut self, other: WordFrequency) {
        for (language, words) in other.counts {
            let counts = self.counts.entry(language).or_default();
            for (word, count) in words {
                *counts.entry(word).or_insert(0) += count;
            }
        }
    }

    /// Distinct words seen for a language.
    pub fn distinct(&self, language: Language) -> usize {
        self.counts.get(&language).map_or(0, HashMap::len)
    }

    /// Keep frequent words, most frequent first, capped per language.
    pub fn top(&self, language: Language, config: &SuggestionsConfig) -> Vec<Suggestion> {
        let Some(counts) = self.counts.get(&language) else {
            return Vec::new();
        };

        let mut words: Vec<(&String, u64)> = counts
            .iter()
            .filter(|(word, freq)| **freq >= config.min_frequency && word.chars().count() > 1)
            .map(|(word, freq)| (word, *freq))
            .collect();

        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        words.truncate(config.max_per_language);

        words
            .into_iter()
            .map(|(word, frequency)| Suggestion {
                word: word.clone(),
                language,
                frequency,
            })
            .collect()
    }

    /// Build the final table, keyed by word.
    ///
    /// Languages are written in indexing order, so a word found in both
    /// keeps the later language's entry.
    pub fn into_table(self, config: &SuggestionsConfig) -> SuggestionTable {
        let mut table = SuggestionTable::default();
        for language in Language::ALL {
            let top = self.top(language, config);
            table.per_language.insert(language, top.len());
            for suggestion in top {
                table.words.insert(suggestion.word.clone(), suggestion);
            }
        }
        table
    }
}

/// Final suggestion table stored with the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct SuggestionTable {
    words: BTreeMap<String, Suggestion>,
    per_language: BTreeMap<Language, usize>,
}

impl SuggestionTable {
    pub fn get(&self, word: &str) -> Option<&Suggestion> {
        self.words.get(word)
    }

    /// Suggestions starting with `prefix`, most frequent first.
    pub fn complete(&self, prefix: &str, limit: usize) -> Vec<&Suggestion> {
        let mut hits: Vec<&Suggestion> = self
            .words
            .range(prefix.to_string()..)
            .take_while(|(word, _)| word.starts_with(prefix))
            .map(|(_, s)| s)
            .collect();
        hits.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.word.cmp(&b.word)));
        hits.truncate(limit);
        hits
    }

    /// Suggestions selected for a language before merging by word.
    pub fn selected(&self, language: Language) -> usize {
        self.per_language.get(&language).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
