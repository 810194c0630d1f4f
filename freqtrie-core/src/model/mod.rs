//! Top-level module for the frequency trie.
//!
//! - Tokenization strategies (`Tokenizer`)
//! - Counted tree nodes (`Node`)
//! - Lazy transition-probability walks (`Transitions`)
//! - The public façade (`FrequencyTrie`)

/// Public façade over the counted tree.
///
/// Exposes insertion, probability queries, search, autocompletion,
/// merging and generation.
pub mod frequency_trie;

/// Counted tree node keyed by token.
///
/// Holds the iterative walks every query is built on.
pub mod node;

/// Tokenization strategies turning an input string into tree keys.
pub mod tokenizer;

/// Transition triples and the lazy walk producing them.
pub mod transition;
