use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use freqtrie_core::model::frequency_trie::FrequencyTrie;
use freqtrie_core::model::tokenizer::Tokenizer;

/// Tokenizer selected on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
	/// One key per character
	Characters,
	/// One key per space-separated word
	Words,
}

impl From<Mode> for Tokenizer {
	fn from(mode: Mode) -> Self {
		match mode {
			Mode::Characters => Tokenizer::Characters,
			Mode::Words => Tokenizer::Words,
		}
	}
}

#[derive(Parser, Debug)]
#[command(name = "freqtrie-server")]
#[command(version)]
#[command(about = "HTTP service over a frequency-weighted prefix tree", long_about = None)]
struct Cli {
	/// Address to bind
	#[arg(long, env = "FREQTRIE_HOST", default_value = "127.0.0.1")]
	host: String,

	/// Port to bind
	#[arg(long, env = "FREQTRIE_PORT", default_value_t = 5000)]
	port: u16,

	/// How inserted strings are split into keys
	#[arg(long, env = "FREQTRIE_MODE", value_enum, default_value = "characters")]
	mode: Mode,
}

/// One tree shared by every worker: inserts take the write lock,
/// queries share the read lock.
type SharedTrie = web::Data<RwLock<FrequencyTrie>>;

/// Query parameters for `/v1/probability` and `/v1/transitions`
#[derive(Deserialize)]
struct SequenceParams {
	sequence: Option<String>,
	given: Option<String>,
}

/// Query parameters for `/v1/contains` and `/v1/find`
#[derive(Deserialize)]
struct InputParams {
	input: Option<String>,
	substring: Option<bool>,
}

/// Query parameters for `/v1/suggest` and `/v1/generate`
#[derive(Deserialize)]
struct PrefixParams {
	prefix: Option<String>,
}

/// Body of a `/v1/find` response
#[derive(Serialize)]
struct FindResult {
	found: bool,
	key: Option<String>,
	len: usize,
}

fn lock_failed() -> HttpResponse {
	warn!("Trie lock poisoned");
	HttpResponse::InternalServerError().body("Trie lock failed")
}

fn missing(name: &str) -> HttpResponse {
	HttpResponse::BadRequest().body(format!("Missing '{name}' parameter"))
}

/// HTTP PUT endpoint `/v1/insert`
///
/// Inserts every non-empty line of the body and returns how many were inserted.
#[put("/v1/insert")]
async fn put_insert(data: SharedTrie, body: String) -> impl Responder {
	let mut trie = match data.write() {
		Ok(t) => t,
		Err(_) => return lock_failed(),
	};

	let mut inserted = 0;
	for line in body.lines().filter(|l| !l.is_empty()) {
		trie.insert(line);
		inserted += 1;
	}
	info!("Inserted {} lines, {} entries in total", inserted, trie.len());
	HttpResponse::Ok().body(inserted.to_string())
}

#[get("/v1/len")]
async fn get_len(data: SharedTrie) -> impl Responder {
	match data.read() {
		Ok(trie) => HttpResponse::Ok().body(trie.len().to_string()),
		Err(_) => lock_failed(),
	}
}

/// HTTP GET endpoint `/v1/probability`
///
/// Returns `P(sequence | given)`, `given` defaulting to the empty string.
#[get("/v1/probability")]
async fn get_probability(data: SharedTrie, query: web::Query<SequenceParams>) -> impl Responder {
	let Some(sequence) = &query.sequence else {
		return missing("sequence");
	};
	let given = query.given.as_deref().unwrap_or("");

	match data.read() {
		Ok(trie) => HttpResponse::Ok().body(trie.p(sequence, given).to_string()),
		Err(_) => lock_failed(),
	}
}

/// HTTP GET endpoint `/v1/transitions`
///
/// Returns the transitions along `sequence` as a JSON array.
#[get("/v1/transitions")]
async fn get_transitions(data: SharedTrie, query: web::Query<SequenceParams>) -> impl Responder {
	let Some(sequence) = &query.sequence else {
		return missing("sequence");
	};

	match data.read() {
		Ok(trie) => HttpResponse::Ok().json(trie.transition_probabilities(sequence).collect::<Vec<_>>()),
		Err(_) => lock_failed(),
	}
}

#[get("/v1/contains")]
async fn get_contains(data: SharedTrie, query: web::Query<InputParams>) -> impl Responder {
	let Some(input) = &query.input else {
		return missing("input");
	};

	match data.read() {
		Ok(trie) => HttpResponse::Ok().body(trie.contains(input).to_string()),
		Err(_) => lock_failed(),
	}
}

/// HTTP GET endpoint `/v1/find`
///
/// Looks for `input` anywhere in the tree. With `substring=true` the match
/// does not have to reach the end of an entry.
#[get("/v1/find")]
async fn get_find(data: SharedTrie, query: web::Query<InputParams>) -> impl Responder {
	let Some(input) = &query.input else {
		return missing("input");
	};

	let trie = match data.read() {
		Ok(t) => t,
		Err(_) => return lock_failed(),
	};
	let node = if query.substring.unwrap_or(false) {
		trie.find_substring(input)
	} else {
		trie.find_first(input)
	};
	HttpResponse::Ok().json(FindResult {
		found: node.is_some(),
		key: node.map(|n| n.key().to_owned()),
		len: node.map_or(0, |n| n.len()),
	})
}

/// HTTP GET endpoint `/v1/suggest`
///
/// Returns the completions of `prefix`, sorted, one per line.
#[get("/v1/suggest")]
async fn get_suggest(data: SharedTrie, query: web::Query<PrefixParams>) -> impl Responder {
	let prefix = query.prefix.as_deref().unwrap_or("");

	let mut suggestions: Vec<String> = match data.read() {
		Ok(trie) => trie.suggest(prefix).into_iter().collect(),
		Err(_) => return lock_failed(),
	};
	suggestions.sort();
	HttpResponse::Ok().body(suggestions.join("\n"))
}

/// HTTP GET endpoint `/v1/generate`
///
/// Returns one entry sampled from the observed transitions, starting with `prefix`.
#[get("/v1/generate")]
async fn get_generate(data: SharedTrie, query: web::Query<PrefixParams>) -> impl Responder {
	let prefix = query.prefix.as_deref().unwrap_or("");

	match data.read() {
		Ok(trie) => match trie.generate(prefix) {
			Some(generated) => HttpResponse::Ok().body(generated),
			None => HttpResponse::NotFound().body(format!("Nothing starts with '{prefix}'")),
		},
		Err(_) => lock_failed(),
	}
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(put_insert)
		.service(get_len)
		.service(get_probability)
		.service(get_transitions)
		.service(get_contains)
		.service(get_find)
		.service(get_suggest)
		.service(get_generate);
}

/// Main entry point for the server.
///
/// Creates an empty tree with the configured tokenizer, wraps it in a
/// `RwLock` and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();
	let cli = Cli::parse();

	let shared_trie = web::Data::new(RwLock::new(FrequencyTrie::new(cli.mode.into())));
	info!("Serving a {:?} tree on {}:{}", cli.mode, cli.host, cli.port);

	HttpServer::new(move || {
		let cors = Cors::default()
			.allow_any_origin()
			.allowed_methods(vec!["GET", "PUT"])
			.allow_any_header();
		App::new()
			.wrap(cors)
			.app_data(shared_trie.clone())
			.configure(routes)
	})
		.bind((cli.host.as_str(), cli.port))?
		.run()
		.await
}
