//! # Configuration Errors
//!
//! Errors raised while loading definitions and building the registries.
//! Once an [`Integration`](crate::lifecycle::Integration) is built, nothing in
//! the dispatch path returns these; runtime outcomes are
//! [`Envelope`](crate::model::Envelope)s.

/// Errors raised while compiling a field or mapping path.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty segment in path '{0}'")]
    EmptySegment(String),
    #[error("Unclosed bracket in path '{0}'")]
    UnclosedBracket(String),
    #[error("Invalid index '{index}' in path '{path}'")]
    InvalidIndex { path: String, index: String },
}

/// Errors that can occur while loading definitions.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Can't create an integration without sources")]
    NoSources,
    #[error("Can't create an integration without datatypes")]
    NoDatatypes,
    #[error("Datatype defined twice: {0}")]
    DuplicateDatatype(String),
    #[error("Can't create mapping without type")]
    MappingWithoutType,
    #[error("Can't create mapping with unknown type '{0}'")]
    UnknownMappingType(String),
    #[error("Source '{source_id}' references unknown adapter '{adapter}'")]
    UnknownAdapter { source_id: String, adapter: String },
    #[error("Unknown access rule '{0}'")]
    UnknownAccess(String),
    #[error("Invalid path: {0}")]
    Path(#[from] PathError),
    #[error("Invalid definitions: {0}")]
    Definitions(#[from] serde_json::Error),
}
