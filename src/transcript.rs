use crate::llm::{ChatMessage, Role};

/// Events that mutate the conversation transcript.
#[derive(Debug, Clone)]
pub enum TranscriptEvent {
    UserAsked(String),
    PlaceholderOpened,
    FragmentReceived(String),
    AnswerFailed(String),
}

/// Ordered conversation history for the current document session.
///
/// Append-only: entries are only ever added, except that the trailing
/// assistant entry grows in place while an answer streams, and is replaced
/// wholesale when an answer fails.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Single reducer for all transcript mutations.
    pub fn apply(&mut self, event: TranscriptEvent) {
        match event {
            TranscriptEvent::UserAsked(text) => self.messages.push(ChatMessage::user(text)),
            TranscriptEvent::PlaceholderOpened => self.messages.push(ChatMessage::model("")),
            TranscriptEvent::FragmentReceived(fragment) => match self.messages.last_mut() {
                Some(last) if last.role == Role::Model => last.content.push_str(&fragment),
                // Only reachable on a caller ordering bug; drop rather than corrupt.
                _ => tracing::warn!("dropped fragment: transcript does not end with a model turn"),
            },
            TranscriptEvent::AnswerFailed(message) => match self.messages.last_mut() {
                Some(last) if last.role == Role::Model => last.content = message,
                _ => self.messages.push(ChatMessage::model(message)),
            },
        }
    }

    pub fn append_user_turn(&mut self, text: impl Into<String>) {
        self.apply(TranscriptEvent::UserAsked(text.into()));
    }

    /// Open the empty assistant entry the next answer will stream into.
    pub fn append_placeholder(&mut self) {
        self.apply(TranscriptEvent::PlaceholderOpened);
    }

    pub fn append_fragment(&mut self, fragment: impl Into<String>) {
        self.apply(TranscriptEvent::FragmentReceived(fragment.into()));
    }

    /// Overwrite a failed or partial answer with a final message.
    pub fn replace_last_answer(&mut self, text: impl Into<String>) {
        self.apply(TranscriptEvent::AnswerFailed(text.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_concatenate_in_call_order() {
        let mut transcript = Transcript::new();
        transcript.append_user_turn("question");
        transcript.append_placeholder();
        transcript.append_fragment("x");
        transcript.append_fragment("y");

        let last = transcript.messages().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.content, "xy");
    }

    #[test]
    fn fragment_without_model_tail_is_dropped() {
        let mut transcript = Transcript::new();
        transcript.append_user_turn("question");
        transcript.append_fragment("stray");

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].content, "question");
    }

    #[test]
    fn failure_replaces_partial_answer() {
        let mut transcript = Transcript::new();
        transcript.append_user_turn("question");
        transcript.append_placeholder();
        transcript.append_fragment("Partial");
        transcript.replace_last_answer("Something went wrong.");

        let last = transcript.messages().last().unwrap();
        assert_eq!(last.content, "Something went wrong.");
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn failure_appends_when_tail_is_not_model() {
        let mut transcript = Transcript::new();
        transcript.append_user_turn("question");
        transcript.replace_last_answer("Something went wrong.");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].role, Role::Model);
    }
}
