//! # Solve Orchestrator
//!
//! Drives one question through the full pipeline: validate, check the
//! response cache, compose the subject prompt, call the completion
//! endpoint, structure the raw text, then cache and persist the result.
//!
//! Persistence is fire-and-forget: the response returns without waiting
//! for the history insert, and an insert failure only logs a warning.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::ResponseCache;
use crate::error::SolveError;
use crate::gemini::CompletionClient;
use crate::history::{HistoryRecord, HistoryStore};
use crate::models::{Solution, Solved, SolveRequest, Subject};
use crate::parser::StepParser;
use crate::prompts;
use crate::validate::validate;

/// End-to-end question solving pipeline
pub struct Solver {
    client: Arc<dyn CompletionClient>,
    history: Arc<HistoryStore>,
    cache: ResponseCache,
    parser: StepParser,
}

impl Solver {
    pub fn new(client: Arc<dyn CompletionClient>, history: Arc<HistoryStore>) -> Self {
        Self::with_cache(client, history, ResponseCache::new())
    }

    /// Construct with a specific cache (useful for testing TTL behavior)
    pub fn with_cache(
        client: Arc<dyn CompletionClient>,
        history: Arc<HistoryStore>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            client,
            history,
            cache,
            parser: StepParser::new(),
        }
    }

    /// Solve one question.
    ///
    /// Validation failures and upstream errors return early; nothing is
    /// cached or persisted for a failed request.
    pub async fn solve(&self, request: &SolveRequest) -> Result<Solved, SolveError> {
        let started = Instant::now();

        let subject = validate(&request.user_id, &request.query, &request.subject)?;
        let cache_key = ResponseCache::key(&request.query, subject);

        if let Some(solution) = self.cache.get(&cache_key) {
            tracing::debug!(subject = %subject, "Serving solve from cache");
            return Ok(Solved {
                solution,
                subject,
                cached: true,
                response_time_ms: started.elapsed().as_millis(),
            });
        }

        let prompt = prompts::build_prompt(subject, &request.query);
        let raw = self.client.complete(&prompt).await?;
        let solution = self.parser.parse(&raw);

        tracing::info!(
            subject = %subject,
            steps = solution.steps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Solved question"
        );

        self.cache.put(cache_key, solution.clone());
        self.persist(request, subject, solution.clone());

        Ok(Solved {
            solution,
            subject,
            cached: false,
            response_time_ms: started.elapsed().as_millis(),
        })
    }

    /// Queue the history insert without blocking the response
    fn persist(&self, request: &SolveRequest, subject: Subject, solution: Solution) {
        let record = HistoryRecord::new(&request.user_id, &request.query, subject, solution);
        let history = Arc::clone(&self.history);

        tokio::spawn(async move {
            if let Err(e) = history.insert(&record) {
                tracing::warn!("Failed to persist solve history: {:#}", e);
            }
        });
    }
}
