pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that a caller may want to tell apart. These travel inside an `anyhow::Error` and can
/// be recovered with `downcast_ref::<ClientError>()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// An API call was made before authentication completed.
    #[error("API client not initialised, authenticate first")]
    NotReady,

    /// The test call after the OAuth flow did not report an authenticated session.
    #[error("OAuth2 flow seems to have failed, the test call was not authenticated")]
    AuthFailed,

    /// The API answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Request {
        operation: String,
        status: u16,
        body: String,
    },

    /// The API answered successfully but a required key was not in the body.
    #[error("{operation} response is missing '{field}'")]
    MissingField {
        operation: String,
        field: &'static str,
    },

    #[error("Could not retrieve accounts information, no accounts were returned")]
    NoAccounts,

    #[error("Could not find a personal account")]
    NoPersonalAccount,

    #[error("Transaction '{0}' is not among the loaded transactions")]
    UnknownTransaction(String),
}

impl ClientError {
    pub(crate) fn request(operation: impl Into<String>, status: u16, body: impl ToString) -> Self {
        Self::Request {
            operation: operation.into(),
            status,
            body: body.to_string(),
        }
    }

    pub(crate) fn missing(operation: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            operation: operation.into(),
            field,
        }
    }
}

/// Returns the `ClientError` carried by `e`, if there is one.
pub fn client_error(e: &Error) -> Option<&ClientError> {
    e.downcast_ref::<ClientError>()
}
