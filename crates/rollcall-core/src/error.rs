use thiserror::Error;

/// Which side of a card-to-position binding is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// The card is bound to another member.
    CardOwned { owner_position: String },

    /// The member holding the position already carries a different card.
    PositionBound { existing_card: String },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::CardOwned { owner_position } => {
                write!(f, "card is already registered to position: {owner_position}")
            }
            Conflict::PositionBound { existing_card } => {
                write!(f, "position already has card {existing_card} registered")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // Attendance errors
    #[error("Unknown card: {0}")]
    UnknownCard(String),

    #[error("Sign-in not allowed before {0}")]
    BeforeHours(String),

    #[error("Sign-in not allowed after {0}")]
    AfterHours(String),

    #[error("No active session for member {0}")]
    NoActiveSession(crate::types::MemberId),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    // Registration errors
    #[error("Registration conflict: {0}")]
    RegistrationConflict(Conflict),

    #[error("No member record found for position: {0}")]
    NoMemberForPosition(String),

    // Validation errors
    #[error("Invalid card format: {0}")]
    InvalidCardFormat(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap any store failure at the boundary of a controller operation.
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    /// Short machine-friendly name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnknownCard(_) => "unknown_card",
            Error::BeforeHours(_) => "before_hours",
            Error::AfterHours(_) => "after_hours",
            Error::NoActiveSession(_) => "no_active_session",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::RegistrationConflict(_) => "registration_conflict",
            Error::NoMemberForPosition(_) => "no_member_for_position",
            Error::InvalidCardFormat(_) => "invalid_card_format",
            Error::InvalidStateTransition { .. } => "invalid_state_transition",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
