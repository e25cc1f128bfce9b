//! Serde definitions, as written by users.
//!
//! Most fields accept a shorthand besides the full form. The shorthands only
//! exist here; [`load`](super::load) turns every definition into the runtime
//! types, so nothing past the load step has to deal with them.

use crate::datatype::AccessRule;
use crate::error::ConfigError;
use crate::framework::IdentOptions;
use crate::endpoint::Matcher;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The complete set of definitions for one integration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defs {
    #[serde(default)]
    pub sources: Vec<SourceDef>,
    #[serde(default)]
    pub datatypes: Vec<DatatypeDef>,
    #[serde(default)]
    pub mappings: Vec<MappingDef>,
    /// `null` entries are skipped.
    #[serde(default)]
    pub auths: Vec<Option<AuthDef>>,
    #[serde(default)]
    pub ident: IdentOptions,
}

impl Defs {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl From<OneOrMany> for Matcher {
    fn from(value: OneOrMany) -> Self {
        Matcher::from(value.into_vec())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDef {
    pub id: String,
    pub adapter: String,
    /// Id of an auth definition.
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
    /// Mappings declared on the source default to it.
    #[serde(default)]
    pub mappings: Vec<MappingDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointDef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<OneOrMany>,
    #[serde(default)]
    pub scope: Option<OneOrMany>,
    #[serde(default)]
    pub action: Option<OneOrMany>,
    #[serde(default)]
    pub params: BTreeMap<String, bool>,
    #[serde(default)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatatypeDef {
    pub id: String,
    #[serde(default)]
    pub plural: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSpec>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipSpec>,
    #[serde(default)]
    pub access: Option<AccessDef>,
    #[serde(default)]
    pub internal: bool,
}

/// `"string"` or `{"type": "string", "default": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeSpec {
    Type(String),
    Full {
        #[serde(rename = "type")]
        attr_type: String,
        #[serde(default)]
        default: Option<Value>,
    },
}

/// `"user"` or `{"type": "user", "default": ..., "query": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RelationshipSpec {
    Type(String),
    Full {
        #[serde(rename = "type")]
        rel_type: String,
        #[serde(default)]
        default: Option<Value>,
        #[serde(default)]
        query: Option<Map<String, Value>>,
    },
}

/// `"all"`, `"auth"`, `{"role": "admin"}` or `{"ident": "johnf"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AccessDef {
    Keyword(String),
    Role { role: String },
    Ident { ident: String },
}

impl TryFrom<AccessDef> for AccessRule {
    type Error = ConfigError;

    fn try_from(def: AccessDef) -> Result<Self, Self::Error> {
        match def {
            AccessDef::Keyword(keyword) => match keyword.as_str() {
                "all" => Ok(AccessRule::All),
                "auth" => Ok(AccessRule::Auth),
                _ => Err(ConfigError::UnknownAccess(keyword)),
            },
            AccessDef::Role { role } => Ok(AccessRule::Role(role)),
            AccessDef::Ident { ident } => Ok(AccessRule::Ident(ident)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDef {
    #[serde(default)]
    pub id: Option<String>,
    /// One mapping is built per listed type.
    #[serde(default, rename = "type")]
    pub types: Option<OneOrMany>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub relationships: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub transform: Option<OneOrMany>,
    #[serde(default)]
    pub filter_from: Option<OneOrMany>,
    #[serde(default)]
    pub filter_to: Option<OneOrMany>,
}

/// `"headline"`, `["headline", "name"]`, `{}` (path equals the key) or
/// `{"path": ..., "format": "cents"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Path(String),
    Paths(Vec<String>),
    Full {
        #[serde(default)]
        path: Option<OneOrMany>,
        #[serde(default)]
        format: Option<String>,
    },
}

impl FieldSpec {
    /// Raw paths for field `key`, primary first. Never empty.
    pub fn paths(&self, key: &str) -> Vec<String> {
        let paths = match self {
            Self::Path(path) => vec![path.clone()],
            Self::Paths(paths) => paths.clone(),
            Self::Full { path, .. } => path.clone().map(OneOrMany::into_vec).unwrap_or_default(),
        };
        if paths.is_empty() {
            vec![key.to_string()]
        } else {
            paths
        }
    }

    pub fn format(&self) -> Option<&str> {
        match self {
            Self::Full { format, .. } => format.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthDef {
    pub id: String,
    pub strategy: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}
