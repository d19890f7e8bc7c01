use thiserror::Error;

use crate::schema::FieldRole;

#[derive(Debug, Error)]
pub enum AccuRevError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid source path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("malformed reply from accurev: {0}")]
    MalformedReply(String),

    #[error("unable to get list of streams from accurev: expected exactly one root stream, found {found}")]
    NoRootStream { found: usize },

    #[error("login failed for user '{user}': {output}")]
    AuthenticationFailed { user: String, output: String },

    #[error("{role} field '{name}' not found in AccuWork schema")]
    SchemaFieldNotFound { role: FieldRole, name: String },

    #[error("{role} field '{name}' is defined {count} times in AccuWork schema")]
    AmbiguousSchemaField {
        role: FieldRole,
        name: String,
        count: usize,
    },

    #[error("field '{name}' has a non-numeric field id '{value}'")]
    InvalidFieldId { name: String, value: String },

    #[error("only fields defined as type 'Choose' in AccuWork may be used for filtering (field='{name}', type='{kind}')")]
    InvalidCategoryFieldType { name: String, kind: String },

    #[error("category filter '{0}' given but no category field is configured")]
    CategoryFilterNotConfigured(String),

    #[error("query value '{0}' may not contain a double quote")]
    InvalidQueryValue(String),

    #[error("issue tracking requires a depot name")]
    DepotNotConfigured,

    #[error(transparent)]
    Tool(#[from] accurev_process::ProcessError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl From<quick_xml::Error> for AccuRevError {
    fn from(e: quick_xml::Error) -> Self {
        AccuRevError::MalformedReply(e.to_string())
    }
}

impl AccuRevError {
    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        AccuRevError::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, AccuRevError>;
