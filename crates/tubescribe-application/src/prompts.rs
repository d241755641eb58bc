//! Prompt templates of the AI actions.
//!
//! Templates are rendered with minijinja. Every template receives the
//! transcript already cut to the character budget; the chat template also
//! receives the user's question.

use minijinja::{Environment, context};
use tubescribe_core::action::{AiAction, truncate_chars};
use tubescribe_core::{Result, ScribeError};

const SUMMARIZE: &str = r#"# IDENTITY and PURPOSE

You are an expert content summarizer. You take content in and output a Markdown formatted summary using the format below.

Take a deep breath and think step by step about how to best accomplish this goal using the following steps.

# OUTPUT SECTIONS

- Combine all of your understanding of the content into a single, 20-word sentence in a section called ONE SENTENCE SUMMARY:.

- Output the 10 most important points of the content as a list with no more than 16 words per point into a section called MAIN POINTS:.

- Output a list of the 5 best takeaways from the content in a section called TAKEAWAYS:.

# OUTPUT INSTRUCTIONS

- Create the output using the formatting above.
- You only output human readable Markdown.
- Output numbered lists, not bullets.
- Do not output warnings or notes, just the requested sections.
- Do not repeat items in the output sections.
- Do not start items with the same opening words.

# INPUT:

INPUT:
{{ transcript }}"#;

const EXPLAIN: &str = r#"Analyze the key themes and arguments in this transcript, including:
- Main points and supporting evidence
- The speaker's position and reasoning
- Any logical fallacies or strong arguments
- Overall effectiveness of the presentation

Transcript:
{{ transcript }}"#;

const QUIZ: &str = r#"Write a quiz of 5 multiple-choice questions that checks understanding of the video below.
For each question give four options labelled A-D, then the correct answer and a one-sentence explanation.
Only ask about things the transcript actually covers.

Transcript:
{{ transcript }}"#;

const NOTES: &str = r#"Take structured study notes on the video below.
Use Markdown headings for the main topics and short bullet points under each.
Finish with a list of key terms and their definitions.

Transcript:
{{ transcript }}"#;

const CHAT: &str = r#"You are an AI assistant who has knowledge of the video transcript. Your goal is to help users understand the content by answering questions based on the transcript. Be concise, helpful, and accurate. If information is not in the transcript, you can say that it's not covered in the video.

Transcript:
{{ transcript }}

User: {{ question }}"#;

/// Compiled prompt templates.
pub struct PromptLibrary {
    env: Environment<'static>,
    transcript_budget: usize,
}

impl PromptLibrary {
    pub fn new(transcript_budget: usize) -> Result<Self> {
        let mut env = Environment::new();
        for (action, source) in [
            (AiAction::Summarize, SUMMARIZE),
            (AiAction::Explain, EXPLAIN),
            (AiAction::Quiz, QUIZ),
            (AiAction::Notes, NOTES),
            (AiAction::ChatTurn, CHAT),
        ] {
            env.add_template(template_name(action), source)
                .map_err(template_error)?;
        }
        Ok(Self {
            env,
            transcript_budget,
        })
    }

    pub fn transcript_budget(&self) -> usize {
        self.transcript_budget
    }

    /// Renders the prompt of `action` over `transcript`.
    ///
    /// `question` is required for [`AiAction::ChatTurn`] and ignored otherwise.
    pub fn render(
        &self,
        action: AiAction,
        transcript: &str,
        question: Option<&str>,
    ) -> Result<String> {
        let question = question.map(str::trim).unwrap_or_default();
        if action.takes_user_input() && question.is_empty() {
            return Err(ScribeError::invalid_request("a chat turn needs a question"));
        }

        let template = self
            .env
            .get_template(template_name(action))
            .map_err(template_error)?;
        template
            .render(context! {
                transcript => truncate_chars(transcript, self.transcript_budget),
                question => question,
            })
            .map_err(template_error)
    }
}

fn template_name(action: AiAction) -> &'static str {
    match action {
        AiAction::Summarize => "summarize",
        AiAction::Explain => "explain",
        AiAction::Quiz => "quiz",
        AiAction::Notes => "notes",
        AiAction::ChatTurn => "chat_turn",
    }
}

fn template_error(err: minijinja::Error) -> ScribeError {
    ScribeError::internal(format!("prompt template: {err}"))
}
