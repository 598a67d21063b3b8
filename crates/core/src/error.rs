/// Domain-level errors shared across the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid value for {field}: {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },
}
