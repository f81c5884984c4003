//! Chat read-retrieve-read orchestration.
//!
//! Three sequential calls per request: reformulate the conversation into a
//! search query, retrieve supporting documents, then generate a grounded
//! answer from the assembled prompt. No retries and no state between
//! invocations; upstream failures end the request.

use std::time::Instant;

use tracing::{debug, info};

use crate::history::{history_as_text, ChatTurn, DEFAULT_HISTORY_TOKENS};
use crate::integrations::{CompletionClient, SearchClient, SearchOptions};
use crate::messages::messages_from_prompt;
use crate::metrics;
use crate::prompts::{
    render_answer_prompt, render_query_prompt, PromptOverride, FOLLOW_UP_QUESTIONS_PROMPT,
    ROLE_END, ROLE_START,
};
use crate::{Error, Result};

const DEFAULT_TOP: u32 = 3;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const QUERY_MAX_TOKENS: u32 = 32;
const ANSWER_MAX_TOKENS: u32 = 1024;

/// Per-request overrides. All optional; unset (or falsy) values fall back
/// to the documented defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub semantic_captions: bool,
    pub top: Option<u32>,
    pub exclude_category: Option<String>,
    pub semantic_ranker: bool,
    pub suggest_followup_questions: bool,
    pub prompt_template: Option<String>,
    pub temperature: Option<f32>,
}

/// Response envelope: supporting excerpts, generated answer, debug trace.
#[derive(Debug, Clone)]
pub struct Answer {
    pub data_points: Vec<String>,
    pub answer: String,
    pub thoughts: String,
}

/// Retrieve-then-read orchestrator over one search index and one
/// completion service.
#[derive(Debug, Clone)]
pub struct ChatReadRetrieveRead {
    search: SearchClient,
    completion: CompletionClient,
    chatgpt_deployment: String,
    gpt_deployment: String,
    chatgpt_model: String,
    sourcepage_field: String,
    content_field: String,
    semantic_configuration: String,
    query_language: String,
    query_speller: String,
    answer_max_tokens: u32,
    default_temperature: f32,
}

impl ChatReadRetrieveRead {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        search: SearchClient,
        completion: CompletionClient,
        chatgpt_deployment: impl Into<String>,
        gpt_deployment: impl Into<String>,
        chatgpt_model: impl Into<String>,
        sourcepage_field: impl Into<String>,
        content_field: impl Into<String>,
    ) -> Self {
        Self {
            search,
            completion,
            chatgpt_deployment: chatgpt_deployment.into(),
            gpt_deployment: gpt_deployment.into(),
            chatgpt_model: chatgpt_model.into(),
            sourcepage_field: sourcepage_field.into(),
            content_field: content_field.into(),
            semantic_configuration: crate::config::DEFAULT_SEMANTIC_CONFIGURATION.to_string(),
            query_language: crate::config::DEFAULT_QUERY_LANGUAGE.to_string(),
            query_speller: crate::config::DEFAULT_QUERY_SPELLER.to_string(),
            answer_max_tokens: ANSWER_MAX_TOKENS,
            default_temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Build the orchestrator from loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let search = SearchClient::new(
            config.search_endpoint.clone(),
            config.search_api_key.clone(),
            config.search_index.clone(),
        )?;
        let completion = CompletionClient::new(
            config.openai_endpoint.clone(),
            config.openai_api_key.clone(),
        )?;

        Ok(Self {
            semantic_configuration: config.semantic_configuration.clone(),
            query_language: config.query_language.clone(),
            query_speller: config.query_speller.clone(),
            answer_max_tokens: config.openai_max_tokens,
            default_temperature: config.openai_temperature,
            ..Self::new(
                search,
                completion,
                config.chatgpt_deployment.clone(),
                config.gpt_deployment.clone(),
                config.chatgpt_model.clone(),
                config.sourcepage_field.clone(),
                config.content_field.clone(),
            )
        })
    }

    /// Run the full pipeline for one chat history.
    pub async fn run(&self, history: &[ChatTurn], overrides: &Overrides) -> Result<Answer> {
        let last_turn = history
            .last()
            .ok_or_else(|| Error::InvalidArgument("chat history is empty".to_string()))?;

        let top = match overrides.top {
            Some(t) if t > 0 => t,
            _ => DEFAULT_TOP,
        };
        let filter = overrides
            .exclude_category
            .as_deref()
            .map(|category| format!("category ne '{}'", category.replace('\'', "''")));

        // STEP 1: Generate an optimized keyword search query from the chat
        // history and the last question
        let query_prompt = render_query_prompt(
            &history_as_text(history, false, DEFAULT_HISTORY_TOKENS),
            &last_turn.user,
        );
        metrics::record_stage_start("query_rewrite");
        let started = Instant::now();
        let query_result = self
            .completion
            .completion(
                &self.gpt_deployment,
                &query_prompt,
                0.0,
                QUERY_MAX_TOKENS,
                &["\n"],
            )
            .await;
        metrics::record_stage_result("query_rewrite", started.elapsed(), query_result.is_ok());
        let query = query_result?;
        info!(query = %query, "reformulated search query");

        // STEP 2: Retrieve relevant documents with the optimized query
        let options = if overrides.semantic_ranker {
            SearchOptions {
                filter: filter.clone(),
                query_type: Some("semantic".to_string()),
                query_language: Some(self.query_language.clone()),
                query_speller: Some(self.query_speller.clone()),
                semantic_configuration_name: Some(self.semantic_configuration.clone()),
                top: Some(top),
                query_caption: overrides
                    .semantic_captions
                    .then(|| "extractive|highlight-false".to_string()),
            }
        } else {
            SearchOptions {
                filter: filter.clone(),
                top: Some(top),
                ..Default::default()
            }
        };
        metrics::record_stage_start("search");
        let started = Instant::now();
        let search_result = self.search.search(&query, &options).await;
        metrics::record_stage_result("search", started.elapsed(), search_result.is_ok());
        let documents = search_result?;
        debug!(hits = documents.len(), "search returned documents");

        let data_points: Vec<String> = documents
            .iter()
            .map(|doc| {
                let page = doc.field_str(&self.sourcepage_field).unwrap_or_default();
                let text = if overrides.semantic_captions {
                    let joined = doc
                        .captions
                        .iter()
                        .map(|c| c.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" . ");
                    nonewlines(&joined)
                } else {
                    nonewlines(doc.field_str(&self.content_field).unwrap_or_default())
                };
                format!("{}: {}", page, text)
            })
            .collect();
        let sources = data_points.join("\n");

        // STEP 3: Generate a contextual answer from the search results and
        // chat history
        let follow_up = if overrides.suggest_followup_questions {
            FOLLOW_UP_QUESTIONS_PROMPT
        } else {
            ""
        };
        let prompt_override = PromptOverride::parse(overrides.prompt_template.as_deref());
        let prompt = render_answer_prompt(
            &prompt_override,
            &sources,
            &history_as_text(history, true, DEFAULT_HISTORY_TOKENS),
            follow_up,
        );
        let messages = messages_from_prompt(&prompt);
        debug!(messages = messages.len(), "assembled chat messages");

        let temperature = match overrides.temperature {
            Some(t) if t != 0.0 => t,
            _ => self.default_temperature,
        };
        metrics::record_stage_start("chat");
        let started = Instant::now();
        let answer_result = self
            .completion
            .chat_completion(
                &self.chatgpt_deployment,
                &self.chatgpt_model,
                &messages,
                temperature,
                self.answer_max_tokens,
                &[ROLE_END, ROLE_START],
            )
            .await;
        metrics::record_stage_result("chat", started.elapsed(), answer_result.is_ok());
        let answer = answer_result?;
        info!(answer_len = answer.len(), "generated answer");

        let thoughts = format!(
            "Searched for:<br>{}<br><br>Prompt:<br>{}",
            query,
            prompt.replace('\n', "<br>")
        );

        Ok(Answer {
            data_points,
            answer,
            thoughts,
        })
    }
}

/// Strip embedded line breaks so excerpts stay single-line.
fn nonewlines(text: &str) -> String {
    text.replace('\n', " ").replace('\r', " ")
}
