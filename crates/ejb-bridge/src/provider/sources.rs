//! Provider search sources and the ordered search

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{
    namespaced_property, BindingProvider, ProviderRegistry, PROVIDER_PROPERTY,
    WRAPPER_IMPLEMENTATION,
};
use crate::types::{BridgeError, Result};

/// Where a candidate name came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderSource {
    NamespacedProperty,
    ServiceEntry(usize),
    RuntimeProperties,
    StandardProperty,
}

impl fmt::Display for ProviderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSource::NamespacedProperty => write!(f, "property {}", namespaced_property()),
            ProviderSource::ServiceEntry(i) => write!(f, "service entry {}", i),
            ProviderSource::RuntimeProperties => f.write_str("runtime properties file"),
            ProviderSource::StandardProperty => write!(f, "property {}", PROVIDER_PROPERTY),
        }
    }
}

/// Inputs of the provider search
#[derive(Clone, Debug, Default)]
pub struct ProviderSources {
    /// Process-wide properties
    pub properties: HashMap<String, String>,
    /// Service registry entries, each the content of one registry resource
    pub service_entries: Vec<String>,
    /// Runtime-environment properties file
    pub runtime_properties: Option<PathBuf>,
}

impl ProviderSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_service_entry(mut self, entry: impl Into<String>) -> Self {
        self.service_entries.push(entry.into());
        self
    }

    pub fn with_runtime_properties(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_properties = Some(path.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Parse `key=value` / `key: value` lines; `#` and `!` start comments
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(|c: char| c == '=' || c == ':')?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

/// Load a properties file; a missing file is `Ok(None)`
pub fn load_properties(path: &Path) -> Result<Option<HashMap<String, String>>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(parse_properties(&text))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// First meaningful line of a service registry entry
fn service_entry_name(entry: &str) -> Option<&str> {
    entry
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .find(|line| !line.is_empty())
}

/// Try one candidate name; `None` means keep searching
fn try_candidate(
    registry: &ProviderRegistry,
    source: ProviderSource,
    name: Option<&str>,
) -> Option<(String, Arc<dyn BindingProvider>)> {
    let name = name.map(str::trim).filter(|n| !n.is_empty())?;
    if name == WRAPPER_IMPLEMENTATION {
        debug!("Skipping wrapping provider named by {}", source);
        return None;
    }
    match registry.instantiate(name) {
        Ok(provider) => {
            info!("Using binding provider {} from {}", name, source);
            Some((name.to_string(), provider))
        }
        Err(e) => {
            warn!("Unable to construct provider implementation {}: {}", name, e);
            None
        }
    }
}

/// Resolve the binding provider
///
/// Returns the winning implementation name together with the instance.
/// Exhausting every source is a [`BridgeError::Configuration`].
pub fn find_provider(
    registry: &ProviderRegistry,
    sources: &ProviderSources,
) -> Result<(String, Arc<dyn BindingProvider>)> {
    let namespaced = namespaced_property();
    if let Some(found) = try_candidate(
        registry,
        ProviderSource::NamespacedProperty,
        sources.property(&namespaced),
    ) {
        return Ok(found);
    }

    for (i, entry) in sources.service_entries.iter().enumerate() {
        if let Some(found) = try_candidate(
            registry,
            ProviderSource::ServiceEntry(i),
            service_entry_name(entry),
        ) {
            return Ok(found);
        }
    }

    if let Some(path) = &sources.runtime_properties {
        match load_properties(path) {
            Ok(Some(properties)) => {
                let name = properties.get(PROVIDER_PROPERTY).map(String::as_str);
                if let Some(found) =
                    try_candidate(registry, ProviderSource::RuntimeProperties, name)
                {
                    return Ok(found);
                }
            }
            Ok(None) => debug!("No runtime properties file at {}", path.display()),
            Err(e) => warn!("Ignoring unreadable properties file {}: {}", path.display(), e),
        }
    }

    if let Some(found) = try_candidate(
        registry,
        ProviderSource::StandardProperty,
        sources.property(PROVIDER_PROPERTY),
    ) {
        return Ok(found);
    }

    Err(BridgeError::Configuration(format!(
        "no {} implementation found",
        PROVIDER_PROPERTY
    )))
}
