use crate::llm::{AnswerStream, ChatMessage, LlmError, TextGenerator};

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("no document text available to answer from")]
    NoDocument,
    #[error("question is empty")]
    EmptyQuestion,
    #[error(transparent)]
    Streaming(#[from] LlmError),
}

/// System directive constraining the model to the supplied document text.
fn grounding_instruction(document_text: &str) -> String {
    format!(
        "You are an expert Q&A assistant. Your task is to answer questions based *only* on \
         the content of a document provided by the user. Do not use any external knowledge. \
         If the information to answer a question is not present in the document, you must \
         state that you cannot find the answer in the provided text. Be concise and helpful.\n\n\
         The document content is as follows:\n---\n{document_text}\n---"
    )
}

/// Prior turns plus the new question, in the service's ordered turn format.
fn build_turns(prior_turns: &[ChatMessage], question: &str) -> Vec<ChatMessage> {
    let mut turns = prior_turns.to_vec();
    turns.push(ChatMessage::user(question));
    turns
}

/// Open a streaming answer for `question`, grounded in `document_text`.
///
/// Each invocation is a fresh independent request; cancellation is simply
/// dropping the returned stream. Mid-stream transport failures surface as
/// the stream's final item; fragments already yielded are not retracted.
pub async fn answer_stream(
    generator: &dyn TextGenerator,
    document_text: &str,
    question: &str,
    prior_turns: &[ChatMessage],
) -> Result<AnswerStream, AnswerError> {
    if document_text.trim().is_empty() {
        return Err(AnswerError::NoDocument);
    }
    let question = question.trim();
    if question.is_empty() {
        return Err(AnswerError::EmptyQuestion);
    }

    let stream = generator
        .stream_answer(
            &grounding_instruction(document_text),
            build_turns(prior_turns, question),
        )
        .await?;
    Ok(stream)
}
