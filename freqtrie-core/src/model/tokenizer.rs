use serde::{Deserialize, Serialize};

/// Terminal token appended to every key sequence.
///
/// Marks "end of sequence" and is never produced by `split` for a
/// non-empty piece of content (word mode excepted, see `Tokenizer::Words`).
pub const SENTINEL: &str = "";

/// Capability shared by every tokenization strategy: turn a string into
/// the ordered keys used to build tree paths.
pub trait KeySequence {
	/// Splits the input into content tokens, without the sentinel.
	fn split(&self, input: &str) -> Vec<String>;

	/// String used to rejoin tokens into text.
	fn separator(&self) -> &'static str;

	/// Splits the input and appends the sentinel.
	///
	/// The result is never empty.
	fn tokenize(&self, input: &str) -> Vec<String> {
		let mut tokens = self.split(input);
		tokens.push(SENTINEL.to_owned());
		tokens
	}

	/// Joins content tokens back into text.
	fn join<'a, I>(&self, tokens: I) -> String
	where
		I: IntoIterator<Item = &'a str>,
	{
		tokens.into_iter().collect::<Vec<_>>().join(self.separator())
	}
}

/// The standard tokenization strategies.
///
/// Both are case-insensitive: the input is lower-cased before splitting.
///
/// # Variants
/// - `Characters`: one token per Unicode scalar value.
/// - `Words`: split on the space character. Like a plain split, an empty
///   input gives a single empty token, and so do consecutive spaces.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tokenizer {
	#[default]
	Characters,
	Words,
}

impl KeySequence for Tokenizer {
	fn split(&self, input: &str) -> Vec<String> {
		let lower = input.to_lowercase();
		match self {
			Tokenizer::Characters => lower.chars().map(String::from).collect(),
			Tokenizer::Words => lower.split(' ').map(str::to_owned).collect(),
		}
	}

	fn separator(&self) -> &'static str {
		match self {
			Tokenizer::Characters => "",
			Tokenizer::Words => " ",
		}
	}
}
