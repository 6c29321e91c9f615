//! Test doubles for the language-model and search collaborators.

use crate::client::{ChatModel, CompletionResponse, SearchProvider, StructuredRequest};
use crate::models::{
    ClaimCheckError, KnowledgePanel, OrganicResult, PaaAnswer, RelatedQuestion, Result,
    SearchError, SearchResultBundle,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(String),
    Fail(String),
    MissingKey,
}

/// `ChatModel` that replays scripted turns in order.
pub struct ScriptedModel {
    turns: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<StructuredRequest>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<Scripted>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(content: impl Into<String>) -> Self {
        Self::new(vec![Scripted::Reply(content.into())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<StructuredRequest> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn complete_structured(&self, request: StructuredRequest) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request);

        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Scripted::Fail("no scripted turns left".to_string()));

        match turn {
            Scripted::Reply(content) => Ok(CompletionResponse {
                content,
                model: "scripted-model".to_string(),
                input_tokens: 0,
                output_tokens: 0,
                duration: Duration::ZERO,
            }),
            Scripted::Fail(message) => Err(ClaimCheckError::ParseError(message)),
            Scripted::MissingKey => Err(ClaimCheckError::MissingCredential {
                service: "language model".to_string(),
                env_var: "OPENAI_API_KEY".to_string(),
            }),
        }
    }
}

/// `SearchProvider` answering from a table, counting calls.
#[derive(Default)]
pub struct MockSearch {
    bundles: HashMap<String, SearchResultBundle>,
    failing: Vec<String>,
    panicking: Vec<String>,
    delays: HashMap<String, Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, bundle: SearchResultBundle) -> Self {
        self.bundles.insert(query.to_string(), bundle);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    /// Panic inside `search` for `query`, aborting the task that runs it.
    pub fn panicking_on(mut self, query: &str) -> Self {
        self.panicking.push(query.to_string());
        self
    }

    pub fn delayed(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str) -> std::result::Result<SearchResultBundle, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        if self.panicking.iter().any(|q| q == query) {
            panic!("search provider crashed on {query}");
        }

        if self.failing.iter().any(|q| q == query) {
            return Err(SearchError::HttpStatus {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }

        Ok(self.bundles.get(query).cloned().unwrap_or_default())
    }
}

pub fn organic(link: &str) -> OrganicResult {
    OrganicResult {
        title: format!("Title for {link}"),
        description: format!("Description for {link}"),
        link: link.to_string(),
        display_link: link.trim_start_matches("https://").to_string(),
        provenance: None,
    }
}

/// Bundle with `count` organic results linking to `https://<prefix>.example/<i>`.
pub fn bundle_with_links(prefix: &str, count: usize) -> SearchResultBundle {
    SearchResultBundle {
        organic: (0..count)
            .map(|i| organic(&format!("https://{prefix}.example/{i}")))
            .collect(),
        knowledge: None,
        people_also_ask: Vec::new(),
    }
}

pub fn knowledge(description: &str) -> KnowledgePanel {
    KnowledgePanel {
        description: description.to_string(),
        facts: Vec::new(),
    }
}

pub fn question(text: &str) -> RelatedQuestion {
    RelatedQuestion {
        question: text.to_string(),
        answers: vec![PaaAnswer {
            text: format!("Answer to {text}"),
        }],
    }
}
