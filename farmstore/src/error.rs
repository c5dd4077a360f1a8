use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmStoreError {
    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("Invalid email or password")]
    AuthenticationFailed,

    #[error("Email already registered: {email}")]
    DuplicateEmail { email: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt state: {0}")]
    CorruptState(String),

    #[error("Version conflict: document is at version {actual}, write was based on {expected}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Cart empty")]
    EmptyCart,

    #[error("Please login to place an order")]
    NotSignedIn,

    #[error("Please select a payment method")]
    PaymentMethodRequired,

    #[error("No payment is pending")]
    NoPendingPayment,

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl FarmStoreError {
    /// True for failures of the storage medium itself (disk, database).
    pub fn is_persistence(&self) -> bool {
        matches!(self, FarmStoreError::Persistence(_) | FarmStoreError::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, FarmStoreError>;
