use std::path::Path;

use game_types::WordPair;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::WordBankError;

const BUILTIN_PAIRS: &str = include_str!("../words/word_pairs.txt");

/// Fixed catalog of word pairs the role assignment draws from
#[derive(Debug, Clone)]
pub struct WordBank {
    pairs: Vec<WordPair>,
}

impl WordBank {
    /// Parse a `word1 | word2 | hint` list, skipping comments and blank lines
    pub fn from_word_list(word_list: &str) -> Result<Self, WordBankError> {
        let mut pairs = Vec::new();

        for (index, line) in word_list.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('|').map(str::trim).collect();
            match fields.as_slice() {
                [word1, word2, hint]
                    if !word1.is_empty() && !word2.is_empty() && !hint.is_empty() =>
                {
                    pairs.push(WordPair {
                        word1: word1.to_string(),
                        word2: word2.to_string(),
                        hint: hint.to_string(),
                    });
                }
                _ => {
                    return Err(WordBankError::Malformed {
                        line: index + 1,
                        content: line.to_string(),
                    });
                }
            }
        }

        if pairs.is_empty() {
            return Err(WordBankError::Empty);
        }

        Ok(Self { pairs })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WordBankError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_word_list(&contents)
    }

    /// The catalog compiled into the crate
    pub fn builtin() -> Result<Self, WordBankError> {
        Self::from_word_list(BUILTIN_PAIRS)
    }

    /// Uniformly sample one pair
    pub fn random_word_pair<R: Rng + ?Sized>(&self, rng: &mut R) -> WordPair {
        self.pairs
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| self.pairs[0].clone())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[WordPair] {
        &self.pairs
    }
}
