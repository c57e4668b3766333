use serde::Serialize;
use tracing::info;

use crate::context;
use crate::db::TranscriptStore;
use crate::error::Result;
use crate::generate::LanguageGenerator;
use crate::search::{self, Query};

/// System prompt framing the generator as a meeting analyst.
pub const SYSTEM_PROMPT: &str = "\
You are an AI assistant specialized in analyzing meeting transcripts and providing
detailed answers about meeting contents. Your role is to:
1. Understand and summarize key points from meetings
2. Identify and explain decisions made
3. Track action items and their assignees
4. Provide context about discussions
5. Reference specific parts of the conversation when answering questions
6. Maintain confidentiality and professional tone

When answering questions:
- Be specific and reference the exact part of the transcript
- Include relevant context about who said what
- Highlight any decisions or action items related to the question
- If information is not in the transcript, clearly state that
";

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
}

/// Resolve the query, render the matching transcripts, and ask the
/// generator. The engine-side steps are deterministic; only the final call
/// leaves the process.
pub fn answer_question(
    store: &dyn TranscriptStore,
    generator: &dyn LanguageGenerator,
    query: &Query,
    question: &str,
) -> Result<Answer> {
    let user_prompt = build_user_prompt(store, query, question)?;
    let answer = generator.generate(SYSTEM_PROMPT, &user_prompt)?;
    Ok(Answer {
        question: question.to_string(),
        answer,
    })
}

/// Streaming variant; the returned chunks are finite and not restartable.
pub fn stream_answer(
    store: &dyn TranscriptStore,
    generator: &dyn LanguageGenerator,
    query: &Query,
    question: &str,
) -> Result<Box<dyn Iterator<Item = Result<String>>>> {
    let user_prompt = build_user_prompt(store, query, question)?;
    generator.stream_generate(SYSTEM_PROMPT, &user_prompt)
}

fn build_user_prompt(store: &dyn TranscriptStore, query: &Query, question: &str) -> Result<String> {
    let transcripts = search::resolve(store, query)?;
    info!("Answering against {} transcript(s)", transcripts.len());
    let context = context::render(&transcripts);
    Ok(format!("Context:\n{context}\n\nQuestion: {question}"))
}
