use stagehand_core_types::{CommitId, SessionId};
use thiserror::Error;

use crate::operation::OperationKind;

/// Result type alias using UowError
pub type Result<T> = std::result::Result<T, UowError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Setup/Configuration
    StrategyResolution,
    InvalidInput,

    // Association staging
    RelationshipNotFound,
    AmbiguousRelationship,

    // Staging
    PendingLimitExceeded,
    Concurrency,

    // Integration
    Serialization,
    Persistence,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::StrategyResolution => "ERR_STRATEGY_RESOLUTION",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::RelationshipNotFound => "ERR_RELATIONSHIP_NOT_FOUND",
            ExErrorKind::AmbiguousRelationship => "ERR_AMBIGUOUS_RELATIONSHIP",
            ExErrorKind::PendingLimitExceeded => "ERR_PENDING_LIMIT_EXCEEDED",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the staging
/// context (entity type, operation kind, session and commit ids) the error
/// was raised in.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_type: Option<String>,
    operation: Option<OperationKind>,
    session_id: Option<SessionId>,
    commit_id: Option<CommitId>,
    message: String,
    candidates: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_type: None,
            operation: None,
            session_id: None,
            commit_id: None,
            message: String::new(),
            candidates: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity type context
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Add pending operation kind context
    pub fn with_operation(mut self, operation: OperationKind) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Add session ID context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add commit ID context
    pub fn with_commit_id(mut self, commit_id: CommitId) -> Self {
        self.commit_id = Some(commit_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add candidate relationship names (used for AmbiguousRelationship)
    pub fn with_candidates(mut self, names: Vec<String>) -> Self {
        self.candidates = Some(names);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity type context, if any
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Get the pending operation kind, if any
    pub fn operation(&self) -> Option<OperationKind> {
        self.operation
    }

    /// Get the session ID context, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the commit ID context, if any
    pub fn commit_id(&self) -> Option<&CommitId> {
        self.commit_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get candidate relationship names, if any
    pub fn candidates(&self) -> Option<&[String]> {
        self.candidates.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_type) = &self.entity_type {
            write!(f, " (entity_type: {})", entity_type)?;
        }
        if let Some(operation) = self.operation {
            write!(f, " (operation: {})", operation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for unit-of-work operations
#[derive(Error, Debug, Clone)]
pub enum UowError {
    /// No flush strategy was registered for a staged entity type
    #[error("No {operation} strategy registered for entity type {entity_type}")]
    StrategyResolution {
        entity_type: String,
        operation: OperationKind,
    },

    /// Parent has no collection-valued relationship holding the child type
    #[error("No relationship on {parent_type} holds {child_type}")]
    RelationshipNotFound {
        parent_type: String,
        child_type: String,
    },

    /// Parent has several relationships holding the child type and no name was given
    #[error("Ambiguous relationship on {parent_type} for {child_type}: {candidates:?}")]
    AmbiguousRelationship {
        parent_type: String,
        child_type: String,
        candidates: Vec<String>,
    },

    /// Staging would exceed the configured pending-entity bound
    #[error("Pending limit of {limit} exceeded: {pending} staged, {requested} requested")]
    PendingLimitExceeded {
        limit: usize,
        pending: usize,
        requested: usize,
    },

    /// A staged entity was still borrowed by the caller when it had to be accessed
    #[error("Entity of type {entity_type} is already borrowed")]
    EntityBorrowed { entity_type: String },

    /// Unit-of-work options rejected at session creation
    #[error("Invalid unit-of-work options: {0}")]
    InvalidOptions(ExError),

    /// Failure raised by the executor, connection or a custom entity operation
    #[error("{0}")]
    Persistence(ExError),
}

impl From<ExError> for UowError {
    fn from(err: ExError) -> Self {
        UowError::Persistence(err)
    }
}

/// Conversion from UowError to the canonical ExError
///
/// `Persistence` errors already carry an ExError and are returned unchanged.
impl From<UowError> for ExError {
    fn from(err: UowError) -> Self {
        match err {
            UowError::StrategyResolution {
                entity_type,
                operation,
            } => ExError::new(ExErrorKind::StrategyResolution)
                .with_op("flush")
                .with_entity_type(entity_type)
                .with_operation(operation)
                .with_message("No flush strategy registered for entity type"),

            UowError::RelationshipNotFound {
                parent_type,
                child_type,
            } => ExError::new(ExErrorKind::RelationshipNotFound)
                .with_entity_type(parent_type)
                .with_message(format!("No relationship holds {}", child_type)),

            UowError::AmbiguousRelationship {
                parent_type,
                child_type,
                candidates,
            } => ExError::new(ExErrorKind::AmbiguousRelationship)
                .with_entity_type(parent_type)
                .with_message(format!(
                    "{} relationships hold {}; select one by name",
                    candidates.len(),
                    child_type
                ))
                .with_candidates(candidates),

            UowError::PendingLimitExceeded {
                limit,
                pending,
                requested,
            } => ExError::new(ExErrorKind::PendingLimitExceeded)
                .with_op("stage")
                .with_message(format!(
                    "Limit {} exceeded: {} staged, {} requested",
                    limit, pending, requested
                )),

            UowError::EntityBorrowed { entity_type } => ExError::new(ExErrorKind::Concurrency)
                .with_entity_type(entity_type)
                .with_message("Entity is already borrowed"),

            UowError::InvalidOptions(inner) => inner,

            UowError::Persistence(inner) => inner,
        }
    }
}
