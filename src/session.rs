use crate::document::LoadedDocument;
use crate::llm::{ChatMessage, TextGenerator};
use crate::qa::{self, AnswerError};
use crate::summary::{self, Summary, SummaryError};
use crate::transcript::Transcript;
use uuid::Uuid;

/// Assistant message seeding the transcript after a successful summary.
pub const GREETING: &str =
    "I've summarized the document for you. Feel free to ask me any questions about it.";

/// Final content of an assistant turn whose stream failed mid-answer.
pub const ANSWER_FAILED_MESSAGE: &str =
    "Sorry, I encountered an error trying to answer. Please try again.";

/// Banner shown when summarization fails.
pub const SUMMARY_FAILED_MESSAGE: &str = "Failed to generate summary. Please try again.";

/// Which asynchronous operation currently holds the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpState {
    #[default]
    Idle,
    Summarizing,
    Answering,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no document loaded")]
    NoDocument,
    #[error("another operation is already in flight")]
    Busy,
    #[error("question is empty")]
    EmptyQuestion,
}

/// Capture of the document a summarization call was issued against, used to
/// discard the result if the document was replaced in the meantime.
#[derive(Debug, Clone)]
pub struct SummaryJob {
    pub document_id: Uuid,
    pub document_text: String,
}

/// Capture of an in-flight answer: the grounding text, the question, and
/// the conversation as it stood before the question was appended.
#[derive(Debug, Clone)]
pub struct AnswerJob {
    pub document_id: Uuid,
    pub document_text: String,
    pub question: String,
    pub prior_turns: Vec<ChatMessage>,
}

/// All state for one analysis session: the loaded document, its summary,
/// the Q&A transcript, the in-flight marker and the last error banner.
/// Everything is volatile; nothing survives the process.
#[derive(Debug, Default)]
pub struct Session {
    document: Option<LoadedDocument>,
    summary: Option<Summary>,
    transcript: Transcript,
    state: OpState,
    error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> OpState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Install a freshly loaded document, dropping everything tied to the
    /// previous one: summary, transcript and error banner.
    pub fn install_document(&mut self, document: LoadedDocument) {
        tracing::info!(name = %document.name, bytes = document.text.len(), "document loaded");
        self.document = Some(document);
        self.summary = None;
        self.transcript = Transcript::new();
        self.error = None;
    }

    /// Move to `Summarizing` and capture the request inputs. Rejected when
    /// any operation is already in flight.
    pub fn begin_summarizing(&mut self) -> Result<SummaryJob, SessionError> {
        if self.state != OpState::Idle {
            return Err(SessionError::Busy);
        }
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        let job = SummaryJob {
            document_id: document.id,
            document_text: document.text.clone(),
        };
        self.state = OpState::Summarizing;
        self.summary = None;
        self.error = None;
        Ok(job)
    }

    /// Apply a finished summarization. A result for a document that has
    /// since been replaced is discarded.
    pub fn finish_summarizing(&mut self, job: &SummaryJob, result: Result<Summary, SummaryError>) {
        self.state = OpState::Idle;
        if !self.is_current(job.document_id) {
            tracing::warn!("discarding summary for a replaced document");
            return;
        }
        match result {
            Ok(summary) => {
                tracing::info!(
                    bullets = summary.bullets.len(),
                    entities = summary.entities.len(),
                    "summary installed"
                );
                self.summary = Some(summary);
                self.transcript = Transcript::new();
                self.transcript.append_placeholder();
                self.transcript.append_fragment(GREETING);
            }
            Err(err) => {
                tracing::error!(error = %err, "summary generation failed");
                self.error = Some(match &err {
                    SummaryError::NoDocument => err.to_string(),
                    _ => SUMMARY_FAILED_MESSAGE.to_string(),
                });
            }
        }
    }

    /// Move to `Answering`: append the user turn plus the assistant
    /// placeholder the stream will fill, and capture the request inputs.
    pub fn begin_answering(&mut self, question: &str) -> Result<AnswerJob, SessionError> {
        if self.state != OpState::Idle {
            return Err(SessionError::Busy);
        }
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }
        let job = AnswerJob {
            document_id: document.id,
            document_text: document.text.clone(),
            question: question.to_string(),
            prior_turns: self.transcript.messages().to_vec(),
        };
        self.state = OpState::Answering;
        self.error = None;
        self.transcript.append_user_turn(question);
        self.transcript.append_placeholder();
        Ok(job)
    }

    /// Append one streamed fragment to the pending answer. Fragments from a
    /// replaced document's stream are dropped.
    pub fn push_fragment(&mut self, job: &AnswerJob, fragment: &str) {
        if !self.is_current(job.document_id) {
            return;
        }
        self.transcript.append_fragment(fragment);
    }

    /// Close out an answer. On failure the placeholder (including any
    /// partial content) is overwritten with the fixed error message so the
    /// transcript never ends with a silently truncated answer.
    pub fn finish_answering(&mut self, job: &AnswerJob, result: Result<(), AnswerError>) {
        self.state = OpState::Idle;
        if !self.is_current(job.document_id) {
            tracing::warn!("discarding answer for a replaced document");
            return;
        }
        if let Err(err) = result {
            tracing::error!(error = %err, "answer stream failed");
            self.transcript.replace_last_answer(ANSWER_FAILED_MESSAGE);
            self.error = Some(ANSWER_FAILED_MESSAGE.to_string());
        }
    }

    /// Run a full summarization round against `generator`. Returns whether
    /// a summary was installed; failures land in the error banner.
    pub async fn run_summarize(
        &mut self,
        generator: &dyn TextGenerator,
    ) -> Result<bool, SessionError> {
        let job = self.begin_summarizing()?;
        let result = summary::summarize(generator, &job.document_text).await;
        let installed = result.is_ok();
        self.finish_summarizing(&job, result);
        Ok(installed && self.summary.is_some())
    }

    /// Run a full question round against `generator`, invoking `on_fragment`
    /// for each piece of the answer as it arrives.
    pub async fn run_ask(
        &mut self,
        generator: &dyn TextGenerator,
        question: &str,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<(), SessionError> {
        let job = self.begin_answering(question)?;

        let outcome = match qa::answer_stream(
            generator,
            &job.document_text,
            &job.question,
            &job.prior_turns,
        )
        .await
        {
            Ok(mut stream) => {
                let mut outcome = Ok(());
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(fragment) => {
                            on_fragment(&fragment);
                            self.push_fragment(&job, &fragment);
                        }
                        Err(err) => {
                            outcome = Err(AnswerError::Streaming(err));
                            break;
                        }
                    }
                }
                outcome
            }
            Err(err) => Err(err),
        };

        self.finish_answering(&job, outcome);
        Ok(())
    }

    fn is_current(&self, document_id: Uuid) -> bool {
        self.document.as_ref().is_some_and(|d| d.id == document_id)
    }
}
