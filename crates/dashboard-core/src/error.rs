use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// An external collaborator failed outright. The affected computation
    /// aborts; the core never substitutes stale or fabricated data.
    #[error("{source_name} source unavailable: {reason}")]
    SourceUnavailable { source_name: &'static str, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DashboardError {
    pub fn source_unavailable(source_name: &'static str, err: anyhow::Error) -> Self {
        Self::SourceUnavailable {
            source_name,
            reason: err.to_string(),
        }
    }
}
