use inference_providers::CompletionError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("API key is not configured")]
    MissingCredential,
    #[error("A report is already being generated")]
    AlreadyRunning,
    #[error("Report generation failed: {0}")]
    Provider(#[from] CompletionError),
    #[error("Failed to read system prompt from {path}: {source}")]
    Prompt {
        path: String,
        source: std::io::Error,
    },
}
