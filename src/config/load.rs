//! The load step: definitions in, registries out.

use super::defs::{
    AttributeSpec, AuthDef, DatatypeDef, Defs, EndpointDef, FieldSpec, MappingDef, OneOrMany,
    RelationshipSpec, SourceDef,
};
use super::Plugins;
use crate::datatype::{AttributeDef, Datatype, Datatypes, Formatter, Formatters, RelationshipDef};
use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::framework::IdentOptions;
use crate::mapping::{FilterPipeline, Mapping, Path, Qualifier, TransformPipeline};
use crate::source::{Authenticator, Source, Sources};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registries built from a set of definitions.
#[derive(Debug)]
pub struct Loaded {
    pub datatypes: Datatypes,
    pub sources: Sources,
    pub ident: IdentOptions,
}

/// Normalizes `defs` and builds the registries.
///
/// Fails on definitions that can't work at all (no sources, no datatypes,
/// mappings without or with unknown types, unknown adapters, malformed
/// paths). Problems that only disable one piece (an auth with an unknown
/// strategy, a mapping without source) are logged and skipped.
pub fn load(defs: Defs, plugins: &Plugins) -> Result<Loaded, ConfigError> {
    if defs.sources.is_empty() {
        return Err(ConfigError::NoSources);
    }
    if defs.datatypes.is_empty() {
        return Err(ConfigError::NoDatatypes);
    }

    let formatters = Formatters::builtin().merged(&plugins.formatters);
    let mut datatypes = Datatypes::new();
    for def in defs.datatypes {
        let id = def.id.clone();
        if !datatypes.insert(build_datatype(def, &formatters)?) {
            return Err(ConfigError::DuplicateDatatype(id));
        }
    }

    let auths = build_auths(defs.auths, plugins);

    let mut inline = Vec::new();
    let mut source_defs = Vec::new();
    for mut def in defs.sources {
        inline.extend(
            std::mem::take(&mut def.mappings)
                .into_iter()
                .map(|mapping| (mapping, Some(def.id.clone()))),
        );
        source_defs.push(def);
    }
    let mut mappings: HashMap<String, Vec<Mapping>> = HashMap::new();
    for (def, default_source) in defs
        .mappings
        .into_iter()
        .map(|mapping| (mapping, None))
        .chain(inline)
    {
        for mapping in build_mappings(def, default_source, &datatypes, &formatters, plugins)? {
            match mapping.source.clone() {
                Some(source) => mappings.entry(source).or_default().push(mapping),
                None => warn!(item_type = mapping.item_type(), "Skipping mapping without source"),
            }
        }
    }

    let mut sources = Sources::new();
    for def in source_defs {
        let source_mappings = mappings.remove(&def.id).unwrap_or_default();
        sources.insert(build_source(def, source_mappings, &auths, plugins)?);
    }
    for (source, orphans) in mappings {
        warn!(%source, count = orphans.len(), "Skipping mappings for unknown source");
    }

    info!(datatypes = datatypes.len(), sources = sources.len(), "Loaded definitions");
    Ok(Loaded {
        datatypes,
        sources,
        ident: defs.ident,
    })
}

fn build_datatype(def: DatatypeDef, formatters: &Formatters) -> Result<Datatype, ConfigError> {
    let mut datatype = Datatype::new(def.id)
        .with_internal(def.internal)
        .with_formatters(formatters.clone());
    if let Some(plural) = def.plural {
        datatype = datatype.with_plural(plural);
    }
    if let Some(source) = def.source {
        datatype = datatype.with_source(source);
    }
    if let Some(access) = def.access {
        datatype = datatype.with_access(access.try_into()?);
    }
    for (key, spec) in def.attributes {
        let attribute = match spec {
            AttributeSpec::Type(attr_type) => AttributeDef::new(attr_type),
            AttributeSpec::Full { attr_type, default } => AttributeDef {
                attr_type,
                default,
            },
        };
        datatype = datatype.with_attribute(key, attribute);
    }
    for (key, spec) in def.relationships {
        let relationship = match spec {
            RelationshipSpec::Type(rel_type) => RelationshipDef::new(rel_type),
            RelationshipSpec::Full {
                rel_type,
                default,
                query,
            } => RelationshipDef {
                rel_type,
                default,
                query,
            },
        };
        datatype = datatype.with_relationship(key, relationship);
    }
    Ok(datatype)
}

fn build_auths(
    defs: Vec<Option<AuthDef>>,
    plugins: &Plugins,
) -> HashMap<String, Arc<dyn Authenticator>> {
    let mut auths = HashMap::new();
    for def in defs {
        let Some(def) = def else {
            warn!("Skipping empty auth definition");
            continue;
        };
        match plugins.auth_strategies.get(&def.strategy) {
            Some(strategy) => {
                debug!(auth = %def.id, strategy = %def.strategy, "Created authenticator");
                auths.insert(def.id, strategy.create(&def.options));
            }
            None => warn!(auth = %def.id, strategy = %def.strategy, "Skipping auth with unknown strategy"),
        }
    }
    auths
}

/// One mapping per listed type.
fn build_mappings(
    def: MappingDef,
    default_source: Option<String>,
    datatypes: &Datatypes,
    formatters: &Formatters,
    plugins: &Plugins,
) -> Result<Vec<Mapping>, ConfigError> {
    let types = def.types.clone().map(OneOrMany::into_vec).unwrap_or_default();
    if types.is_empty() {
        return Err(ConfigError::MappingWithoutType);
    }

    let path = Path::compile(def.path.as_deref().unwrap_or_default())?;
    let qualifier = def.qualifier.as_deref().map(Qualifier::parse).transpose()?;
    let names = |stages: &Option<OneOrMany>| stages.clone().map(OneOrMany::into_vec).unwrap_or_default();
    let transform = TransformPipeline::new(plugins.transformers.resolve(&names(&def.transform)));
    let filter_from = FilterPipeline::new(plugins.filters.resolve(&names(&def.filter_from)));
    let filter_to = FilterPipeline::new(plugins.filters.resolve(&names(&def.filter_to)));

    types
        .iter()
        .map(|item_type| {
            let datatype = datatypes
                .get(item_type)
                .ok_or_else(|| ConfigError::UnknownMappingType(item_type.clone()))?;
            let mut mapping = Mapping::new(datatype.clone())
                .with_path(path.clone())
                .with_transform(transform.clone())
                .with_filter_from(filter_from.clone())
                .with_filter_to(filter_to.clone());
            if let Some(id) = &def.id {
                mapping = mapping.with_id(id.clone());
            }
            if let Some(source) = def
                .source
                .clone()
                .or_else(|| default_source.clone())
                .or_else(|| datatype.source.clone())
            {
                mapping = mapping.with_source(source);
            }
            if let Some(qualifier) = &qualifier {
                mapping = mapping.with_qualifier(qualifier.clone());
            }
            for (key, spec) in &def.attributes {
                let (path, fallbacks) = field_paths(key, spec)?;
                mapping = mapping
                    .map_attribute(key, path, field_formatter(spec, formatters))
                    .with_fallback_paths(key, fallbacks);
            }
            for (key, spec) in &def.relationships {
                let (path, fallbacks) = field_paths(key, spec)?;
                mapping = mapping
                    .map_relationship(key, path, field_formatter(spec, formatters))
                    .with_fallback_paths(key, fallbacks);
            }
            debug!(item_type = %item_type, source = ?mapping.source, "Built mapping");
            Ok(mapping)
        })
        .collect()
}

fn field_paths(key: &str, spec: &FieldSpec) -> Result<(Path, Vec<Path>), ConfigError> {
    let mut paths = spec
        .paths(key)
        .iter()
        .map(|raw| Path::compile(raw.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    let primary = if paths.is_empty() {
        Path::compile(key)?
    } else {
        paths.remove(0)
    };
    Ok((primary, paths))
}

fn field_formatter(spec: &FieldSpec, formatters: &Formatters) -> Option<Arc<dyn Formatter>> {
    let name = spec.format()?;
    let formatter = formatters.get(name);
    if formatter.is_none() {
        warn!(format = %name, "Unknown formatter skipped");
    }
    formatter
}

fn build_source(
    def: SourceDef,
    mappings: Vec<Mapping>,
    auths: &HashMap<String, Arc<dyn Authenticator>>,
    plugins: &Plugins,
) -> Result<Source, ConfigError> {
    let adapter = plugins
        .adapters
        .get(&def.adapter)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownAdapter {
            source_id: def.id.clone(),
            adapter: def.adapter.clone(),
        })?;

    let mut source = Source::new(def.id.clone(), adapter);
    if let Some(auth_id) = &def.auth {
        match auths.get(auth_id) {
            Some(auth) => source = source.with_auth(auth.clone()),
            None => warn!(source = %def.id, auth = %auth_id, "Unknown auth, source runs without"),
        }
    }
    for endpoint in def.endpoints {
        source = source.with_endpoint(build_endpoint(endpoint));
    }
    for mapping in mappings {
        source = source.with_mapping(mapping);
    }
    Ok(source)
}

fn build_endpoint(def: EndpointDef) -> Endpoint {
    let mut endpoint = Endpoint::new(def.options);
    endpoint.id = def.id;
    endpoint.item_type = def.item_type.map(Into::into).unwrap_or_default();
    endpoint.scope = def.scope.map(Into::into).unwrap_or_default();
    endpoint.action = def.action.map(Into::into).unwrap_or_default();
    endpoint.params = def.params;
    endpoint
}
