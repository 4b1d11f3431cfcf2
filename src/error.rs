use std::time::Duration;

use thiserror::Error;

/// Errors that abort a `/parse` request.
///
/// Translation and disambiguation failures never show up here: they are folded into the
/// result as null / absent fields.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Input(String),

    #[error(transparent)]
    Segmentation(#[from] SegmentationError),

    #[error("assembly failed: {0}")]
    Assembly(String),
}

impl PipelineError {
    pub fn no_input() -> Self {
        Self::Input("No input provided".to_string())
    }

    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentationError {
    #[error("cannot segment an empty sentence")]
    EmptySentence,

    #[error("no dictionary senses for token '{token}'")]
    NoSenses { token: String },

    #[error("segmenter failed: {0}")]
    Segmenter(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("translation disabled")]
    Disabled,

    #[error("translation request failed: {0}")]
    Transport(String),

    #[error("translation rate limited")]
    RateLimited,

    #[error("translation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("translation timed out after {0:?}")]
    Timeout(Duration),

    #[error("translation service returned an empty response")]
    EmptyResponse,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisambiguationError {
    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("disambiguation deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Failures of the chat-completions client shared by the model and the `llm` translator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("http: {0}")]
    Http(String),

    #[error("rate limited")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<ChatError> for DisambiguationError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Timeout(d) => Self::Timeout(d),
            ChatError::Decode(msg) => Self::Malformed(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<ChatError> for TranslationError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::RateLimited => Self::RateLimited,
            ChatError::Timeout(d) => Self::Timeout(d),
            ChatError::Status { status, body } => Self::Status { status, body },
            other => Self::Transport(other.to_string()),
        }
    }
}
