//! Prompt templates and override resolution
//!
//! Templates are flat role-tagged transcripts with named substitution
//! slots. Callers may replace the whole answer template or inject extra
//! instructions into the default one with the `>>>` marker.

/// Start-of-line marker declaring the active role for subsequent lines.
pub const ROLE_START: &str = "<|im_start|>";

/// Start-of-line marker closing the active role block.
pub const ROLE_END: &str = "<|im_end|>";

/// Prefix marking a prompt override as an injection into the default template.
pub const INJECTION_MARKER: &str = ">>>";

/// Default answer prompt. Slots: `{follow_up_questions_prompt}`,
/// `{injected_prompt}`, `{sources}`, `{chat_history}`.
pub const ANSWER_PROMPT: &str = "<|im_start|>system
The assistant helps company employees with questions about the employee handbook and company policies. Be brief in your answers.
Answer ONLY with the facts listed in the list of sources below. If there isn't enough information below, say you don't know. Do not generate answers that don't use the sources below. If asking a clarifying question to the user would help, ask the question.
For tabular information return it as an html table. Do not return markdown format.
Each source has a name followed by colon and the actual information, always include the source name for each fact you use in the response. Use square brackets to reference the source, e.g. [info1.txt]. Don't combine sources, list each source separately, e.g. [info1.txt][info2.pdf].
{follow_up_questions_prompt}
{injected_prompt}
Sources:
{sources}
<|im_end|>
{chat_history}
";

/// Instruction block appended when follow-up question suggestions are on.
pub const FOLLOW_UP_QUESTIONS_PROMPT: &str = "Generate three very brief follow-up questions that the user would likely ask next about the employee handbook and company policies.
Use double angle brackets to reference the questions, e.g. <<Are there exclusions for part-time employees?>>.
Try not to repeat questions that have already been asked.
Only generate questions and do not generate any text before or after the questions, such as 'Next Questions'";

/// Search-query reformulation prompt. Slots: `{chat_history}`, `{question}`.
pub const QUERY_PROMPT: &str = "Below is a history of the conversation so far, and a new question asked by the user that needs to be answered by searching in a knowledge base about the employee handbook and company policies.
Generate a search query based on the conversation and the new question.
Do not include cited source filenames and document names e.g info.txt or doc.pdf in the search query terms.
Do not include any text inside [] or <<>> in the search query terms.

Chat History:
{chat_history}

Question:
{question}

Search query:
";

/// How the caller's `prompt_template` override is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOverride {
    /// No override: default template with an empty injection slot.
    Default,
    /// Override started with the injection marker: inject the remainder
    /// into the default template's `{injected_prompt}` slot.
    Inject(String),
    /// Any other override: the whole string is the template.
    Replace(String),
}

impl PromptOverride {
    /// Classify a raw `prompt_template` override.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => PromptOverride::Default,
            Some(text) => match text.strip_prefix(INJECTION_MARKER) {
                Some(rest) => PromptOverride::Inject(rest.to_string()),
                None => PromptOverride::Replace(text.to_string()),
            },
        }
    }
}

/// Render the answer prompt for the resolved override.
pub fn render_answer_prompt(
    prompt_override: &PromptOverride,
    sources: &str,
    chat_history: &str,
    follow_up_questions_prompt: &str,
) -> String {
    match prompt_override {
        PromptOverride::Default => fill_answer_slots(
            ANSWER_PROMPT,
            "",
            sources,
            chat_history,
            follow_up_questions_prompt,
        ),
        PromptOverride::Inject(injected) => fill_answer_slots(
            ANSWER_PROMPT,
            &format!("{}\n", injected),
            sources,
            chat_history,
            follow_up_questions_prompt,
        ),
        PromptOverride::Replace(template) => fill_answer_slots(
            template,
            "",
            sources,
            chat_history,
            follow_up_questions_prompt,
        ),
    }
}

fn fill_answer_slots(
    template: &str,
    injected_prompt: &str,
    sources: &str,
    chat_history: &str,
    follow_up_questions_prompt: &str,
) -> String {
    template
        .replace("{injected_prompt}", injected_prompt)
        .replace("{sources}", sources)
        .replace("{chat_history}", chat_history)
        .replace("{follow_up_questions_prompt}", follow_up_questions_prompt)
}

/// Render the search-query reformulation prompt.
pub fn render_query_prompt(chat_history: &str, question: &str) -> String {
    QUERY_PROMPT
        .replace("{chat_history}", chat_history)
        .replace("{question}", question)
}
