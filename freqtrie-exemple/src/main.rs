use freqtrie_core::model::frequency_trie::FrequencyTrie;
use freqtrie_core::model::tokenizer::Tokenizer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Character mode: every letter is a key, the empty string closes each entry
    let mut chars = FrequencyTrie::for_characters();
    for word in ["foo", "bar", "bare", "bag", "bet"] {
        chars.insert(word);
    }
    println!("Inserted {} words", chars.len());

    // Conditional probabilities: P(sequence | given)
    for (sequence, given) in [("foo", "f"), ("f", ""), ("b", ""), ("ba", "b"), ("be", "b"), ("bet", "be")] {
        println!("P({:?} | {:?}) = {}", sequence, given, chars.p(sequence, given));
    }

    // A condition that is not a prefix of the sequence is impossible
    println!("P(\"bar\" | \"f\") = {}", chars.p("bar", "f"));

    // Step-by-step transitions, stopping at the first unknown key
    for word in ["bare", "bat"] {
        let steps: Vec<String> = chars.transition_probabilities(word).map(|t| t.to_string()).collect();
        println!("{}: {}", word, steps.join(" "));
    }

    // Whole entries, prefixes and entries containing a sequence anywhere
    println!("contains(\"bar\") = {}", chars.contains("bar"));
    println!("contains(\"ba\") = {}", chars.contains("ba"));
    println!("has_prefix(\"ba\") = {}", chars.has_prefix("ba"));
    match chars.find_first("are") {
        Some(node) => println!("find_first(\"are\") -> '{}' ({})", node.key(), node.len()),
        None => println!("find_first(\"are\") -> not found"),
    }

    // Autocompletion, sorted for a stable output
    let mut suggestions: Vec<String> = chars.suggest("ba").into_iter().collect();
    suggestions.sort();
    println!("suggest(\"ba\") = {:?}", suggestions);

    // Word mode, built in parallel then merged with a second corpus
    let corpus: Vec<String> = [
        "why hello there",
        "why hello you",
        "why not",
        "hello there",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let mut words = FrequencyTrie::from_corpus_parallel(Tokenizer::Words, &corpus);
    words.merge(&FrequencyTrie::from_corpus(Tokenizer::Words, ["why me"]))?;

    // Merging trees with different tokenizers is refused
    match chars.merge(&words) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{}", e),
    }

    println!("P(\"why hello\" | \"why\") = {}", words.p("why hello", "why"));
    println!("find_substring(\"hello there\") -> {:?}", words.find_substring("hello there").map(|n| n.key().to_owned()));

    // Random walks weighted by the observed counts
    for i in 0..5 {
        match words.generate("why") {
            Some(sentence) => println!("Generated sentence {}: {}", i + 1, sentence),
            None => println!("Nothing starts with 'why'"),
        }
    }

    Ok(())
}
