use std::collections::{HashMap, HashSet};

use rand::Rng;

use super::tokenizer::SENTINEL;

/// How a token sequence has to line up with the tree to count as a match.
///
/// # Variants
/// - `Exact`: every token, including the trailing sentinel, has an edge.
///   The sequence is a whole inserted entry (or a suffix of one when the
///   walk starts below the root).
/// - `Prefix`: every content token has an edge. The trailing sentinel is
///   not required, so the sequence only has to start an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
	Exact,
	Prefix,
}

/// A node of the counted tree.
///
/// A `Node` stands for one prefix of the inserted token sequences. It is
/// reached from its parent through `key` and counts how many insertions
/// went through it.
///
/// ## Invariants
/// - The root has an empty key and counts every insertion
/// - A node reachable from the root has a count >= 1
/// - `children` only holds tokens that were inserted after this prefix
/// - Each child is owned by exactly one parent (no sharing, no cycles)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
	/// Token this node was reached by (`""` for the root and sentinel nodes).
	key: String,
	/// Number of insertions whose path passes through this node.
	count: usize,
	/// Next tokens observed after this prefix.
	children: HashMap<String, Node>,
}

impl Node {
	/// Creates an unvisited node reached through `key`.
	pub(crate) fn new(key: &str) -> Self {
		Self {
			key: key.to_owned(),
			count: 0,
			children: HashMap::new(),
		}
	}

	/// Token this node was reached by.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Number of inserted sequences passing through this node.
	pub fn len(&self) -> usize {
		self.count
	}

	pub fn is_empty(&self) -> bool {
		self.count == 0
	}

	/// A node without children terminates at least one inserted sequence.
	pub fn is_leaf(&self) -> bool {
		self.children.is_empty()
	}

	/// Returns the child reached through `token`, if it was ever inserted.
	pub fn child(&self, token: &str) -> Option<&Node> {
		self.children.get(token)
	}

	/// Iterates over the children in no particular order.
	pub fn children(&self) -> impl Iterator<Item = &Node> {
		self.children.values()
	}

	/// Records one occurrence of `tokens` below this node.
	///
	/// Every node on the path, this one and the last one included, is
	/// incremented exactly once. Missing nodes are created on the way.
	pub(crate) fn insert_tokens(&mut self, tokens: &[String]) {
		let mut node = self;
		for token in tokens {
			node.count += 1;
			node = node
				.children
				.entry(token.clone())
				.or_insert_with(|| Node::new(token));
		}
		node.count += 1;
	}

	/// Follows `tokens` from this node and stops at the first missing edge.
	///
	/// Returns the deepest node reached and how many tokens were consumed.
	pub(crate) fn walk(&self, tokens: &[String]) -> (&Node, usize) {
		let mut node = self;
		let mut consumed = 0;
		for token in tokens {
			match node.children.get(token) {
				Some(child) => {
					node = child;
					consumed += 1;
				}
				None => break,
			}
		}
		(node, consumed)
	}

	/// Checks whether `tokens` can be followed from this node.
	///
	/// A sequence without content (nothing but the sentinel) always matches.
	pub fn matches(&self, tokens: &[String], mode: MatchMode) -> bool {
		let content = content_of(tokens);
		if content.is_empty() {
			return true;
		}
		let required = match mode {
			MatchMode::Exact => tokens,
			MatchMode::Prefix => content,
		};
		let (_, consumed) = self.walk(required);
		consumed == required.len()
	}

	/// Depth-first search for the first node below which `tokens` match.
	///
	/// This node is tested before any descendant, so a match at the start
	/// of the walk always wins. A sequence starting with the sentinel token
	/// is never found, which in word mode includes inputs with a leading
	/// space.
	pub fn find_first(&self, tokens: &[String], mode: MatchMode) -> Option<&Node> {
		if tokens.first().is_none_or(|first| first == SENTINEL) {
			return None;
		}

		let mut stack = vec![self];
		while let Some(node) = stack.pop() {
			if node.matches(tokens, mode) {
				return Some(node);
			}
			stack.extend(node.children.values());
		}
		None
	}

	/// Collects the text of every leaf below this node.
	///
	/// Each path is `prefix` followed by the keys down to the leaf, joined by
	/// `separator`. The sentinel leaf adds nothing, empty words in the middle
	/// of an entry are kept. A node without children yields an empty set.
	pub(crate) fn leaf_paths(&self, prefix: &str, separator: &str) -> HashSet<String> {
		let mut paths = HashSet::new();
		let start: Vec<&str> = if prefix.is_empty() { Vec::new() } else { vec![prefix] };
		let mut stack = vec![(self, start)];

		while let Some((node, tokens)) = stack.pop() {
			for child in node.children.values() {
				if child.is_leaf() {
					paths.insert(tokens.join(separator));
				} else {
					let mut child_tokens = tokens.clone();
					child_tokens.push(child.key());
					stack.push((child, child_tokens));
				}
			}
		}
		paths
	}

	/// Picks a child using weighted random sampling.
	///
	/// The probability of selecting a child is proportional to its count.
	/// Returns `None` if this node has no children.
	pub(crate) fn sample_child(&self) -> Option<&Node> {
		let total: usize = self.children.values().map(Node::len).sum();
		if total == 0 {
			// Only unvisited placeholders, every one is as good as another
			return self.children.values().next();
		}

		let mut r = rand::rng().random_range(0..total);
		for child in self.children.values() {
			if r < child.count {
				return Some(child);
			}
			r -= child.count;
		}
		None
	}

	/// Adds the counts of `other` into this node and its descendants.
	///
	/// Children missing on this side are created. The result is the tree
	/// that inserting both corpora into one node would have produced.
	pub(crate) fn merge(&mut self, other: &Node) {
		let mut stack: Vec<(&mut Node, &Node)> = vec![(self, other)];
		while let Some((node, other)) = stack.pop() {
			node.count += other.count;
			for key in other.children.keys() {
				node.children
					.entry(key.clone())
					.or_insert_with(|| Node::new(key));
			}
			for (key, child) in node.children.iter_mut() {
				if let Some(other_child) = other.children.get(key) {
					stack.push((child, other_child));
				}
			}
		}
	}
}

/// Strips the trailing sentinel off a key sequence.
fn content_of(tokens: &[String]) -> &[String] {
	match tokens.split_last() {
		Some((last, content)) if last == SENTINEL => content,
		_ => tokens,
	}
}
