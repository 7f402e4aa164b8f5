use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// Fixed message shown when a lookup fails.
pub const FETCH_ERROR_MESSAGE: &str = "There was an error loading the synonyms";

/// Lifecycle of the synonym query for the currently selected word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Loading,
    Loaded(Vec<String>),
    Failed,
}

/// Capability for looking up candidate replacement words.
pub trait SynonymSource {
    fn lookup(&self, word: &str) -> Result<Vec<String>>;
}

/// One lookup the panel wants issued, tagged with the generation it was
/// issued under so its completion can be matched against the current
/// selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub word: String,
}

/// Completion of a lookup, carrying the generation of the request it
/// settles.
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub result: Result<Vec<String>>,
}

/// Runs lookups on background threads and reports completions over an
/// mpsc channel, drained by the UI event loop each tick. The UI thread
/// never blocks on a lookup.
pub struct SynonymFetcher {
    source: Arc<dyn SynonymSource + Send + Sync>,
    tx: Sender<FetchOutcome>,
}

impl SynonymFetcher {
    pub fn new(source: Arc<dyn SynonymSource + Send + Sync>) -> (Self, Receiver<FetchOutcome>) {
        let (tx, rx) = mpsc::channel();
        (Self { source, tx }, rx)
    }

    pub fn spawn(&self, request: FetchRequest) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = source.lookup(&request.word);
            // The receiver is gone only during shutdown.
            let _ = tx.send(FetchOutcome {
                generation: request.generation,
                result,
            });
        });
    }
}

/// State machine behind the synonym panel. Requests are tagged with a
/// generation counter bumped on every selection change, so a completion
/// for a superseded selection is discarded silently.
#[derive(Debug)]
pub struct SynonymPanel {
    word: Option<String>,
    state: QueryState,
    generation: u64,
    cap: usize,
}

impl SynonymPanel {
    pub fn new(cap: usize) -> Self {
        Self {
            word: None,
            state: QueryState::Idle,
            generation: 0,
            cap,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Candidates to display: empty unless the current query loaded.
    pub fn candidates(&self) -> &[String] {
        match &self.state {
            QueryState::Loaded(list) => list,
            _ => &[],
        }
    }

    /// Feed the currently selected word (or none). A transition to a
    /// new word enters `Loading` and returns the request to issue; no
    /// selection resets to `Idle` and issues nothing; an unchanged word
    /// issues nothing.
    pub fn on_selection_change(&mut self, word: Option<&str>) -> Option<FetchRequest> {
        match word {
            None => {
                if self.word.take().is_some() {
                    self.generation += 1;
                }
                self.state = QueryState::Idle;
                None
            }
            Some(w) => {
                if self.word.as_deref() == Some(w) {
                    return None;
                }
                self.word = Some(w.to_string());
                self.state = QueryState::Loading;
                self.generation += 1;
                Some(FetchRequest {
                    generation: self.generation,
                    word: w.to_string(),
                })
            }
        }
    }

    /// Apply a settled fetch. Outcomes from a superseded generation are
    /// dropped; a current one moves to `Loaded` (capped, service order
    /// kept) or `Failed`.
    pub fn on_fetch_settled(&mut self, outcome: FetchOutcome) {
        if outcome.generation != self.generation || self.word.is_none() {
            return;
        }
        self.state = match outcome.result {
            Ok(list) => QueryState::Loaded(list.into_iter().take(self.cap).collect()),
            Err(_) => QueryState::Failed,
        };
    }
}

#[derive(Debug, Deserialize)]
struct DatamuseEntry {
    word: String,
}

/// Client for the Datamuse word-lookup service:
/// `GET {base_url}/words?ml={word}` returns a JSON array of entries
/// whose `word` fields are the candidates, best match first.
pub struct DatamuseClient {
    agent: ureq::Agent,
    base_url: String,
    cap: usize,
}

impl DatamuseClient {
    pub fn new(base_url: &str, cap: usize, timeout_ms: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            cap,
        }
    }
}

impl SynonymSource for DatamuseClient {
    fn lookup(&self, word: &str) -> Result<Vec<String>> {
        let url = format!("{}/words?ml={}", self.base_url, encode_query(word));
        let body = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("Synonym lookup for {word:?} failed"))?
            .into_string()
            .context("Failed to read synonym response")?;
        parse_candidates(&body, self.cap)
    }
}

/// Extract up to `cap` candidate words from a response body, in service
/// order. Ranking is the service's business; never re-sort.
pub fn parse_candidates(body: &str, cap: usize) -> Result<Vec<String>> {
    let entries: Vec<DatamuseEntry> =
        serde_json::from_str(body).context("Unexpected synonym response body")?;
    Ok(entries.into_iter().take(cap).map(|e| e.word).collect())
}

fn encode_query(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for b in word.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}
