use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;

use log::{debug, trace};

use super::node::{MatchMode, Node};
use super::tokenizer::{KeySequence, Tokenizer, SENTINEL};
use super::transition::Transitions;

/// A frequency-weighted prefix tree.
///
/// Ingests strings through a `Tokenizer` and answers statistical questions
/// about the corpus: how likely a continuation is, which transitions a
/// string goes through, whether a token sequence occurs, and which
/// completions exist for a prefix.
///
/// # Responsibilities
/// - Own the root `Node` and the tokenizer shared by the whole tree
/// - Tokenize inputs and delegate to the node walks
/// - Merge trees built from separate parts of a corpus
///
/// # Concurrency
/// Queries only borrow the tree and may run side by side. `insert` and
/// `merge` need `&mut self`; callers sharing a tree between threads wrap it
/// in a lock (one writer, many readers).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrequencyTrie {
	root: Node,
	tokenizer: Tokenizer,
}

impl FrequencyTrie {
	/// Creates an empty tree using the given tokenizer.
	pub fn new(tokenizer: Tokenizer) -> Self {
		Self { root: Node::default(), tokenizer }
	}

	/// Creates an empty tree keyed by lower-cased characters.
	pub fn for_characters() -> Self {
		Self::new(Tokenizer::Characters)
	}

	/// Creates an empty tree keyed by lower-cased, space-separated words.
	pub fn for_words() -> Self {
		Self::new(Tokenizer::Words)
	}

	/// Builds a tree from every line of `lines`, in order.
	pub fn from_corpus<I, S>(tokenizer: Tokenizer, lines: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut trie = Self::new(tokenizer);
		trie.extend(lines);
		trie
	}

	/// Builds a tree from `lines` using one partial tree per chunk.
	///
	/// # Behavior
	/// - Splits the lines into chunks (based on CPU cores * factor).
	/// - Spawns scoped threads, each filling its own partial tree.
	/// - Collects the partial trees over a channel and merges them.
	///
	/// The result is equal to `from_corpus` on the same lines.
	pub fn from_corpus_parallel<S>(tokenizer: Tokenizer, lines: &[S]) -> Self
	where
		S: AsRef<str> + Sync,
	{
		let mut trie = Self::new(tokenizer);
		if lines.is_empty() {
			return trie;
		}

		let factor = 8;
		let chunks = num_cpus::get() * factor;
		let chunk_size = lines.len().div_ceil(chunks);
		debug!("Building from {} lines in chunks of {}", lines.len(), chunk_size);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for chunk in lines.chunks(chunk_size) {
				let tx = tx.clone();
				scope.spawn(move || {
					let partial = Self::from_corpus(tokenizer, chunk);
					// The receiver outlives every sender inside the scope
					let _ = tx.send(partial);
				});
			}
			drop(tx);

			for partial in rx.iter() {
				trie.root.merge(&partial.root);
			}
		});

		debug!("Built tree with {} entries", trie.len());
		trie
	}

	/// Returns the tokenizer shared by the whole tree.
	pub fn tokenizer(&self) -> Tokenizer {
		self.tokenizer
	}

	/// Returns the root node.
	pub fn root(&self) -> &Node {
		&self.root
	}

	/// Number of inserted sequences (the root count).
	pub fn len(&self) -> usize {
		self.root.len()
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_empty()
	}

	/// Key sequence of `input`, sentinel included.
	fn keys(&self, input: &str) -> Vec<String> {
		self.tokenizer.tokenize(input)
	}

	/// Content tokens of `input`. The empty string has none, whatever the
	/// tokenizer would split it into.
	fn content(&self, input: &str) -> Vec<String> {
		if input.is_empty() {
			Vec::new()
		} else {
			self.tokenizer.split(input)
		}
	}

	/// Adds one occurrence of `input` to the tree.
	///
	/// Any string is accepted. The empty string only counts the root and
	/// its sentinel path.
	pub fn insert(&mut self, input: &str) {
		let keys = self.keys(input);
		trace!("Inserting {:?} as {} keys", input, keys.len());
		self.root.insert_tokens(&keys);
	}

	/// Probability of `sequence` given that it starts with `given`.
	///
	/// Both strings are tokenized. `given` must be a token-for-token prefix
	/// of `sequence`, otherwise the conditioning event is inconsistent with
	/// the query and the result is `0.0`. An empty `given` conditions on
	/// nothing, and an empty `sequence` is the sentinel alone.
	///
	/// The result is the product of the transition probabilities of
	/// `sequence` from where `given` ends, with an empty product of `1.0`.
	/// Any step that leaves the observed tree (probability `0.0`) makes the
	/// whole query `0.0`, including steps inside `given`.
	///
	/// # Examples
	/// - `P("", "")` on a tree where `""` was never inserted is `1.0`.
	/// - `P("abc", "")` on an empty tree is `0.0`.
	pub fn p(&self, sequence: &str, given: &str) -> f64 {
		let mut keys = self.content(sequence);
		keys.push(SENTINEL.to_owned());
		let given = self.content(given);
		if !keys.starts_with(&given) {
			return 0.0;
		}

		let mut probability = 1.0;
		for (index, transition) in Transitions::new(&self.root, keys).enumerate() {
			if transition.probability == 0.0 {
				return 0.0;
			}
			if index >= given.len() {
				probability *= transition.probability;
			}
		}
		probability
	}

	/// Lazily walks `sequence` from the root, one transition per token.
	///
	/// See `Transitions` for how each step is scored. The walk has one item
	/// per token unless a missing edge ends it early.
	pub fn transition_probabilities(&self, sequence: &str) -> Transitions<'_> {
		Transitions::new(&self.root, self.keys(sequence))
	}

	/// Checks whether `input` was inserted as a whole entry.
	///
	/// The empty string is always contained, even in an empty tree.
	pub fn contains(&self, input: &str) -> bool {
		input.is_empty() || self.root.matches(&self.keys(input), MatchMode::Exact)
	}

	/// Checks whether some inserted entry starts with `input`.
	pub fn has_prefix(&self, input: &str) -> bool {
		input.is_empty() || self.root.matches(&self.keys(input), MatchMode::Prefix)
	}

	/// Finds the first node from which `input` can be followed to the end
	/// of an entry.
	///
	/// Unlike `contains`, the match may start anywhere in the tree: the
	/// returned node is the parent of the first token of the match. The root
	/// is returned when it already contains `input`. Other ties are broken
	/// by an unspecified traversal order.
	///
	/// # Examples
	/// On a tree holding only `"normal"`, `find_first("mal")` returns the
	/// node keyed `"r"` with a count of 1.
	///
	/// Returns `None` for the empty string.
	pub fn find_first(&self, input: &str) -> Option<&Node> {
		if input.is_empty() {
			return None;
		}
		self.root.find_first(&self.keys(input), MatchMode::Exact)
	}

	/// Like `find_first`, but the match does not have to reach the end of
	/// an entry: `input` may occur anywhere inside an inserted string.
	pub fn find_substring(&self, input: &str) -> Option<&Node> {
		if input.is_empty() {
			return None;
		}
		self.root.find_first(&self.keys(input), MatchMode::Prefix)
	}

	/// Returns every inserted entry starting with `prefix`.
	///
	/// The prefix is lower-cased and followed one character per level,
	/// whatever the tokenizer. A missing character yields an empty set.
	/// Completions are the prefix followed by the keys down to each leaf,
	/// joined by the tokenizer separator.
	pub fn suggest(&self, prefix: &str) -> HashSet<String> {
		let prefix = prefix.to_lowercase();
		let mut node = &self.root;
		let mut buffer = [0u8; 4];
		for c in prefix.chars() {
			match node.child(c.encode_utf8(&mut buffer)) {
				Some(child) => node = child,
				None => return HashSet::new(),
			}
		}
		node.leaf_paths(&prefix, self.tokenizer.separator())
	}

	/// Samples the token following `prefix`.
	///
	/// The probability of each token is proportional to how often it
	/// followed the prefix. The sentinel (`""`) means the entry ends here.
	///
	/// Returns `None` if the prefix was never observed or nothing follows it.
	pub fn predict_next(&self, prefix: &str) -> Option<String> {
		let content = self.content(prefix);
		let (node, consumed) = self.root.walk(&content);
		if consumed != content.len() {
			return None;
		}
		node.sample_child().map(|child| child.key().to_owned())
	}

	/// Generates an entry starting with `prefix` by sampling one token at a
	/// time until the sentinel is drawn.
	///
	/// The result is rebuilt from tokens, so it is lower-cased.
	/// Returns `None` if the prefix was never observed.
	pub fn generate(&self, prefix: &str) -> Option<String> {
		let content = self.content(prefix);
		let (mut node, consumed) = self.root.walk(&content);
		if consumed != content.len() {
			return None;
		}

		let mut tokens: Vec<&str> = content.iter().map(String::as_str).collect();
		while let Some(child) = node.sample_child() {
			if child.is_leaf() && child.key() == SENTINEL {
				break;
			}
			tokens.push(child.key());
			node = child;
		}
		Some(self.tokenizer.join(tokens))
	}

	/// Merges another tree into this one.
	///
	/// Counts are summed node by node, as if the other corpus had been
	/// inserted here.
	///
	/// # Errors
	/// Returns an error if the tokenizers do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.tokenizer != other.tokenizer {
			return Err(format!(
				"Tokenizer mismatch: self={:?}, other={:?}",
				self.tokenizer, other.tokenizer
			));
		}
		debug!("Merging {} entries into {}", other.len(), self.len());
		self.root.merge(&other.root);
		Ok(())
	}
}

impl<S: AsRef<str>> Extend<S> for FrequencyTrie {
	fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
		for input in iter {
			self.insert(input.as_ref());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_close(actual: f64, expected: f64) {
		assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
	}

	fn fruit() -> FrequencyTrie {
		FrequencyTrie::from_corpus(Tokenizer::Characters, ["apple", "avocado", "banana", "bandana"])
	}

	fn b_words() -> FrequencyTrie {
		FrequencyTrie::from_corpus(Tokenizer::Characters, ["foo", "bar", "bare", "bag", "bet"])
	}

	#[test]
	fn insert_increments_root() {
		let mut trie = FrequencyTrie::for_characters();
		assert_eq!(trie.len(), 0);
		trie.insert("hey");
		trie.insert("");
		trie.insert("hey");
		assert_eq!(trie.len(), 3);
		assert_eq!(trie.root().child("h").unwrap().len(), 2);
	}

	#[test]
	fn insert_is_case_insensitive() {
		let mut trie = FrequencyTrie::for_characters();
		trie.insert("Hey");
		trie.insert("HEY");
		assert!(trie.contains("hey"));
		assert_eq!(trie.root().child("h").unwrap().len(), 2);
	}

	#[test]
	fn conditional_probabilities() {
		let trie = b_words();
		assert_close(trie.p("foo", "f"), 1.0);
		assert_close(trie.p("f", ""), 0.2);
		assert_close(trie.p("b", ""), 0.8);
		assert_close(trie.p("ba", "b"), 0.75);
		assert_close(trie.p("be", "b"), 0.25);
		assert_close(trie.p("bet", "be"), 1.0);
	}

	#[test]
	fn inconsistent_condition_is_impossible() {
		let trie = b_words();
		assert_eq!(trie.p("bar", "f"), 0.0);
		assert_eq!(trie.p("b", "bar"), 0.0);
	}

	#[test]
	fn unobserved_sequence_is_impossible() {
		let trie = b_words();
		assert_eq!(trie.p("bat", ""), 0.0);
		assert_eq!(trie.p("bat", "ba"), 0.0);
	}

	#[test]
	fn empty_tree_probabilities() {
		let trie = FrequencyTrie::for_characters();
		assert_eq!(trie.p("abc", ""), 0.0);
		assert_eq!(trie.p("ab", "a"), 0.0);
		assert_eq!(trie.p("", ""), 1.0);
	}

	#[test]
	fn empty_sequence_after_inserting_it() {
		let mut trie = FrequencyTrie::from_corpus(Tokenizer::Characters, ["a", "b", "c"]);
		assert_eq!(trie.p("", ""), 1.0);
		trie.insert("");
		assert_close(trie.p("", ""), 0.25);
	}

	#[test]
	fn word_probabilities() {
		let trie = FrequencyTrie::from_corpus(
			Tokenizer::Words,
			["why hello there", "why hello you", "why not"],
		);
		assert_close(trie.p("why hello", "why"), 2.0 / 3.0);
		assert_close(trie.p("why hello there", "why hello"), 0.5);
		assert_close(trie.p("why", ""), 1.0);
	}

	#[test]
	fn empty_sequence_in_word_mode() {
		let mut trie = FrequencyTrie::from_corpus(Tokenizer::Words, ["why not"]);
		assert_eq!(trie.p("", ""), 1.0);
		trie.insert("");
		assert_close(trie.p("", ""), 0.5);
	}

	#[test]
	fn transition_probabilities_along_apple() {
		let trie = fruit();
		let steps: Vec<f64> = trie.transition_probabilities("apple").map(|t| t.probability).collect();
		assert_eq!(steps, vec![0.5, 0.5, 1.0, 1.0, 1.0, 1.0]);
	}

	#[test]
	fn transition_keys_follow_the_path() {
		let trie = fruit();
		let steps: Vec<(String, String)> = trie
			.transition_probabilities("ban")
			.map(|t| (t.from, t.to))
			.collect();
		let expected = vec![
			("".to_owned(), "b".to_owned()),
			("b".to_owned(), "a".to_owned()),
			("a".to_owned(), "n".to_owned()),
			("n".to_owned(), "".to_owned()),
		];
		assert_eq!(steps, expected);
	}

	#[test]
	fn inner_empty_word_is_not_a_free_ending() {
		let trie = FrequencyTrie::from_corpus(Tokenizer::Words, ["a b"]);
		assert_eq!(trie.p("a  b", ""), 0.0);
		assert_eq!(trie.p("a  c", "a"), 0.0);
		let steps: Vec<f64> = trie.transition_probabilities("a  b").map(|t| t.probability).collect();
		assert_eq!(steps.last(), Some(&0.0));
		assert!(!trie.contains("a  b"));
	}

	#[test]
	fn transition_miss_truncates() {
		let trie = fruit();
		let steps: Vec<f64> = trie.transition_probabilities("apricot").map(|t| t.probability).collect();
		assert_eq!(steps, vec![0.5, 0.5, 0.0]);
	}

	#[test]
	fn contains_whole_entries_only() {
		let trie = fruit();
		assert!(trie.contains("apple"));
		assert!(trie.contains("BANANA"));
		assert!(!trie.contains("app"));
		assert!(!trie.contains("apples"));
		assert!(trie.has_prefix("app"));
		assert!(!trie.has_prefix("apples"));
	}

	#[test]
	fn empty_string_is_always_contained() {
		assert!(FrequencyTrie::for_characters().contains(""));
		assert!(FrequencyTrie::for_words().contains(""));
		assert!(fruit().contains(""));
	}

	#[test]
	fn find_first_substring_of_normal() {
		let trie = FrequencyTrie::from_corpus(Tokenizer::Characters, ["normal"]);
		let node = trie.find_first("mal").unwrap();
		assert_eq!(node.len(), 1);
		assert_eq!(node.key(), "r");
		assert!(trie.find_first("nor").is_none());
		assert!(trie.find_first("").is_none());
	}

	#[test]
	fn find_first_returns_root_for_whole_entries() {
		let trie = fruit();
		assert_eq!(trie.find_first("apple").unwrap(), trie.root());
	}

	#[test]
	fn find_first_rejects_leading_space_in_words() {
		let trie = FrequencyTrie::from_corpus(Tokenizer::Words, ["why so normal", " mal"]);
		assert!(trie.find_first(" mal").is_none());
		assert!(trie.find_first("so normal").is_some());
	}

	#[test]
	fn find_substring_matches_inside_entries() {
		let trie = FrequencyTrie::from_corpus(Tokenizer::Characters, ["normal"]);
		let node = trie.find_substring("rma").unwrap();
		assert_eq!(node.key(), "o");
		assert!(trie.find_substring("mar").is_none());
	}

	#[test]
	fn suggest_completions() {
		let trie = b_words();
		let expected: HashSet<String> = ["bar", "bare", "bag"].iter().map(|s| s.to_string()).collect();
		assert_eq!(trie.suggest("Ba"), expected);
		assert_eq!(trie.suggest("bet"), HashSet::from(["bet".to_owned()]));
		assert_eq!(trie.suggest("").len(), 5);
	}

	#[test]
	fn suggest_unknown_prefix_is_empty() {
		assert!(b_words().suggest("x").is_empty());
		assert!(FrequencyTrie::for_characters().suggest("").is_empty());
	}

	#[test]
	fn suggest_joins_words() {
		let trie = FrequencyTrie::from_corpus(Tokenizer::Words, ["a cat", "a dog"]);
		let expected: HashSet<String> = ["a cat", "a dog"].iter().map(|s| s.to_string()).collect();
		assert_eq!(trie.suggest("a"), expected);
	}

	#[test]
	fn suggest_keeps_empty_words() {
		let trie = FrequencyTrie::from_corpus(Tokenizer::Words, ["a  b", "a c"]);
		let expected: HashSet<String> = ["a  b", "a c"].iter().map(|s| s.to_string()).collect();
		assert_eq!(trie.suggest("a"), expected);
		assert_eq!(trie.generate("a ").as_deref(), Some("a  b"));
	}

	#[test]
	fn predict_next_follows_observed_tokens() {
		let trie = b_words();
		for _ in 0..20 {
			let next = trie.predict_next("ba").unwrap();
			assert!(next == "r" || next == "g");
		}
		assert_eq!(trie.predict_next("bet").as_deref(), Some(""));
		assert!(trie.predict_next("x").is_none());
	}

	#[test]
	fn generate_reproduces_entries() {
		let trie = b_words();
		let entries = trie.suggest("");
		for _ in 0..20 {
			let generated = trie.generate("").unwrap();
			assert!(entries.contains(&generated), "{generated} was never inserted");
		}
		assert_eq!(trie.generate("fo").as_deref(), Some("foo"));
		assert!(trie.generate("z").is_none());
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = FrequencyTrie::from_corpus(Tokenizer::Characters, ["foo", "bar"]);
		let right = FrequencyTrie::from_corpus(Tokenizer::Characters, ["bare", "bag", "bet"]);
		left.merge(&right).unwrap();
		assert_eq!(left, b_words());
	}

	#[test]
	fn merge_rejects_other_tokenizer() {
		let mut chars = FrequencyTrie::for_characters();
		assert!(chars.merge(&FrequencyTrie::for_words()).is_err());
	}

	#[test]
	fn parallel_build_matches_sequential() {
		let lines: Vec<String> = (0..500).map(|i| format!("line {}", i % 37)).collect();
		let sequential = FrequencyTrie::from_corpus(Tokenizer::Words, &lines);
		let parallel = FrequencyTrie::from_corpus_parallel(Tokenizer::Words, &lines);
		assert_eq!(sequential, parallel);
		assert_eq!(parallel.len(), 500);
	}

	#[test]
	fn parallel_build_of_nothing_is_empty() {
		let lines: Vec<String> = Vec::new();
		assert!(FrequencyTrie::from_corpus_parallel(Tokenizer::Characters, &lines).is_empty());
	}
}
