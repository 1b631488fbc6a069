//! Unified error type for denv.
//!
//! All public APIs return `Result<T, DenvError>`. Variants map onto the
//! failure categories an operator needs to act on: which provider failed to
//! start, which variable could not be resolved, which dotenv line is broken.

use thiserror::Error;

/// The unified error type for all denv operations.
#[derive(Debug, Error)]
pub enum DenvError {
    // ── I/O & filesystem ───────────────────────────────────────────────
    /// Filesystem or I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    // ── Parsing ────────────────────────────────────────────────────────
    /// KDL config file parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// A dotenv line has no `=` separator.
    #[error("malformed dotenv line {line_number}: {line:?}")]
    MalformedLine { line_number: usize, line: String },

    // ── Provider construction ──────────────────────────────────────────
    /// A backend client could not be constructed (bad credentials, missing tooling).
    #[error("provider '{provider}' failed to initialize: {message}")]
    ProviderInitFailed { provider: String, message: String },

    /// The config names a backend service this build does not implement.
    #[error("provider '{provider}': unsupported service '{service}'")]
    UnsupportedService { provider: String, service: String },

    /// Two provider declarations share an ID.
    #[error("duplicate provider id '{0}'")]
    DuplicateProvider(String),

    // ── Lookup errors ──────────────────────────────────────────────────
    /// A secret reference names a provider that is not registered.
    #[error("provider '{provider}' referenced by '{name}' is not configured")]
    ProviderNotFound { provider: String, name: String },

    /// The backend call could not complete (network, auth, subprocess exit).
    #[error("provider '{provider}': {message}")]
    BackendUnavailable { provider: String, message: String },

    /// The backend reports that the key does not exist.
    #[error("provider '{provider}': secret '{key}' not found")]
    SecretNotFound { provider: String, key: String },

    /// The secret payload has no field at the requested property path.
    #[error("property '{property}' not found in secret '{key}'")]
    PropertyNotFound { key: String, property: String },

    /// Resolution of one declared variable failed.
    #[error("failed to resolve '{name}': {source}")]
    SecretResolutionFailed {
        name: String,
        #[source]
        source: Box<DenvError>,
    },

    // ── Control flow ───────────────────────────────────────────────────
    /// The operation was cancelled (Ctrl-C, deadline, or a sibling failure).
    #[error("cancelled")]
    Cancelled,

    // ── Catch-all ──────────────────────────────────────────────────────
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────

impl DenvError {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        DenvError::Config(message.into())
    }

    /// Create a provider construction error.
    pub fn init(provider: impl Into<String>, message: impl Into<String>) -> Self {
        DenvError::ProviderInitFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a backend-unavailable error.
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        DenvError::BackendUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a secret-not-found error.
    pub fn not_found(provider: impl Into<String>, key: impl Into<String>) -> Self {
        DenvError::SecretNotFound {
            provider: provider.into(),
            key: key.into(),
        }
    }

    /// Wrap a fetch failure with the variable it was resolving.
    pub fn resolution(name: impl Into<String>, source: DenvError) -> Self {
        DenvError::SecretResolutionFailed {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Classify an AWS Secrets Manager failure, translating common exception
    /// names into user-friendly messages.
    pub fn aws(provider: &str, key: &str, e: impl std::fmt::Display) -> Self {
        let msg = e.to_string();

        if msg.contains("ResourceNotFoundException") {
            return DenvError::not_found(provider, key);
        }

        let friendly = if msg.contains("AccessDeniedException") {
            "Access denied (check IAM permissions)".to_string()
        } else if msg.contains("InvalidParameterException") {
            "Invalid parameter".to_string()
        } else if msg.contains("InvalidRequestException") {
            "Invalid request (secret may be scheduled for deletion)".to_string()
        } else if msg.contains("DecryptionFailure") {
            "Decryption failed (KMS key issue)".to_string()
        } else if msg.contains("InternalServiceError") {
            "AWS internal error (try again later)".to_string()
        } else {
            msg
        };

        DenvError::unavailable(provider, friendly)
    }

    /// Classify a GCP Secret Manager failure, translating common status codes
    /// into user-friendly messages.
    pub fn gcp(provider: &str, key: &str, e: impl std::fmt::Display) -> Self {
        let msg = e.to_string();

        if msg.contains("NOT_FOUND") || msg.contains("notFound") {
            return DenvError::not_found(provider, key);
        }

        let friendly = if msg.contains("PERMISSION_DENIED") || msg.contains("permissionDenied") {
            "Permission denied (check IAM roles for Secret Manager)".to_string()
        } else if msg.contains("UNAUTHENTICATED") || msg.contains("unauthenticated") {
            "Not authenticated (run 'gcloud auth application-default login')".to_string()
        } else if msg.contains("INVALID_ARGUMENT") || msg.contains("invalidArgument") {
            "Invalid argument".to_string()
        } else if msg.contains("RESOURCE_EXHAUSTED") || msg.contains("resourceExhausted") {
            "Resource exhausted (quota limit reached)".to_string()
        } else if msg.contains("FAILED_PRECONDITION") || msg.contains("failedPrecondition") {
            "Failed precondition (secret version may be disabled or destroyed)".to_string()
        } else if msg.contains("UNAVAILABLE") {
            "GCP service unavailable (try again later)".to_string()
        } else {
            msg
        };

        DenvError::unavailable(provider, friendly)
    }

    /// True when this error (or the failure it wraps) is a missing secret.
    pub fn is_not_found(&self) -> bool {
        match self {
            DenvError::SecretNotFound { .. } => true,
            DenvError::SecretResolutionFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Convenience type alias for Results using DenvError.
pub type Result<T> = std::result::Result<T, DenvError>;
