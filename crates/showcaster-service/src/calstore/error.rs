use thiserror::Error;

/// C3 CalStore Client errors: transport failures are retried by the client itself
/// (§4.3); what reaches a caller here is either a 4xx left unretried or a 5xx/network
/// failure that survived the retry budget.
#[derive(Error, Debug)]
pub enum CalStoreError {
    #[error("calstore transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("calstore returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("calstore xml error: {0}")]
    Xml(String),
}

impl CalStoreError {
    /// `true` for a 404 response, the specific status the Event Coordinator treats as
    /// an invariant violation when a RelStore row exists with no matching VEVENT.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

pub type CalStoreResult<T> = std::result::Result<T, CalStoreError>;
