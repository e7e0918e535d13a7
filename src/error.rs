use http::StatusCode;
use kube::core::ErrorResponse;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Error returned by the backing kube client, passed through untouched.
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind} {name} in namespace {namespace}")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("Resource already exists: {kind} {name} in namespace {namespace}")]
    AlreadyExists {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid object: {0}")]
    Invalid(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("JSON patch error: {0}")]
    PatchError(#[from] json_patch::PatchError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Failed to access object metadata: {0}")]
    MetadataError(String),
}

impl Error {
    /// HTTP status an API server answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Kube(kube::Error::Api(resp)) => {
                StatusCode::from_u16(resp.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::AlreadyExists { .. } | Error::Conflict(_) => StatusCode::CONFLICT,
            Error::InvalidRequest(_) | Error::SerializationError(_) | Error::MetadataError(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Invalid(_) | Error::PatchError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Kube(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Kubernetes `Status.reason` for this error.
    pub fn reason(&self) -> &str {
        match self {
            Error::Kube(kube::Error::Api(resp)) => &resp.reason,
            Error::NotFound { .. } => "NotFound",
            Error::AlreadyExists { .. } => "AlreadyExists",
            Error::Conflict(_) => "Conflict",
            Error::InvalidRequest(_) | Error::SerializationError(_) | Error::MetadataError(_) => {
                "BadRequest"
            }
            Error::Invalid(_) | Error::PatchError(_) => "Invalid",
            Error::Kube(_) | Error::Internal(_) => "InternalError",
        }
    }

    /// Build the `kube::Error` a real API server response would turn into.
    pub fn into_kube_err(self) -> kube::Error {
        if let Error::Kube(err) = self {
            return err;
        }
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: self.to_string(),
            reason: self.reason().to_string(),
            code: self.status_code().as_u16(),
        })
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == StatusCode::NOT_FOUND
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code() == StatusCode::CONFLICT
    }
}
