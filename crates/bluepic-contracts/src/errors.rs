use thiserror::Error;

pub const EMPTY_PROMPT_MESSAGE: &str =
    "Please enter a description for the image you want to generate.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("{0}")]
    Validation(String),
    #[error("service returned error status {status}")]
    Backend { status: u16, detail: String },
    #[error("Content filtered: The generated image was flagged as inappropriate.")]
    ContentFiltered,
    #[error("network request failed: {0}")]
    Network(String),
    #[error("backend returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("mock renderer failed: {0}")]
    Render(String),
}

impl GenerateError {
    pub fn empty_prompt() -> Self {
        GenerateError::Validation(EMPTY_PROMPT_MESSAGE.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::Validation(_) => "validation",
            GenerateError::Backend { .. } => "backend",
            GenerateError::ContentFiltered => "content_filtered",
            GenerateError::Network(_) => "network",
            GenerateError::InvalidResponse(_) => "invalid_response",
            GenerateError::Render(_) => "render",
        }
    }

    /// Whether re-running the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerateError::Backend { .. }
                | GenerateError::Network(_)
                | GenerateError::InvalidResponse(_)
        )
    }

    /// Text for the single error display channel.
    pub fn user_message(&self) -> String {
        match self {
            GenerateError::Validation(_) | GenerateError::ContentFiltered => self.to_string(),
            _ => format!("Failed to generate image ({self}). Please try again."),
        }
    }
}
