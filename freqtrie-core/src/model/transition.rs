use std::fmt;
use std::iter::FusedIterator;

use serde::Serialize;

use super::node::Node;
use super::tokenizer::SENTINEL;

/// One step of a walk down the tree.
///
/// `probability` is the chance of moving from the node keyed `from` to the
/// node keyed `to`, estimated from the observed counts.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Transition {
	pub from: String,
	pub to: String,
	pub probability: f64,
}

impl fmt::Display for Transition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{{'{}' -> '{}' {}}}", self.from, self.to, self.probability)
	}
}

/// Lazy walk producing one `Transition` per token.
///
/// Starting from the root, each token is looked up among the current
/// node's children:
/// - Found: `child.count / node.count`, or `1.0` for a child that was never
///   counted. The walk moves to the child.
/// - Missing: a final transition with `0.0`, or `1.0` when the missing token
///   is the terminal sentinel (the sequence already matched completely).
///   Nothing is produced afterwards.
///
/// Created by `FrequencyTrie::transition_probabilities`. Each call starts a
/// fresh walk.
#[derive(Debug)]
pub struct Transitions<'a> {
	node: Option<&'a Node>,
	tokens: std::vec::IntoIter<String>,
}

impl<'a> Transitions<'a> {
	pub(crate) fn new(root: &'a Node, tokens: Vec<String>) -> Self {
		Self {
			node: Some(root),
			tokens: tokens.into_iter(),
		}
	}
}

impl Iterator for Transitions<'_> {
	type Item = Transition;

	fn next(&mut self) -> Option<Transition> {
		let node = self.node?;
		let Some(token) = self.tokens.next() else {
			self.node = None;
			return None;
		};

		match node.child(&token) {
			Some(child) => {
				let probability = if child.is_empty() {
					1.0
				} else {
					child.len() as f64 / node.len() as f64
				};
				self.node = Some(child);
				Some(Transition {
					from: node.key().to_owned(),
					to: token,
					probability,
				})
			}
			None => {
				self.node = None;
				// Only the terminal sentinel may be missing for free, an empty
				// word inside the sequence is ordinary content
				let terminal = token == SENTINEL && self.tokens.as_slice().is_empty();
				let probability = if terminal { 1.0 } else { 0.0 };
				Some(Transition {
					from: node.key().to_owned(),
					to: token,
					probability,
				})
			}
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		match self.node {
			Some(_) => (usize::from(self.tokens.len() > 0), Some(self.tokens.len())),
			None => (0, Some(0)),
		}
	}
}

impl FusedIterator for Transitions<'_> {}
