//! Frequency-weighted prefix tree library.
//!
//! This crate provides a counted trie built from a corpus of strings:
//! - Character-level and word-level tokenization
//! - Occurrence counting along every inserted token path
//! - Conditional and step-by-step transition probabilities
//! - Whole-entry, prefix and substring search
//! - Autocompletion and weighted random generation
//!
//! Only the high-level API is exposed publicly. Node internals are
//! read-only from outside the crate to keep counts consistent.

/// Tokenizer, counted node tree and query engine.
///
/// The entry point is `model::frequency_trie::FrequencyTrie`.
pub mod model;
