//! Provider Tests - client bootstrap resolution
//!
//! These tests resolve binding providers the way a client lookup does:
//! - search order across every provider source
//! - implementations that fail to construct are skipped, not fatal
//! - the bootstrap overlay is visible during the lookup and gone afterwards
//! - port-ref metadata is applied to ports the wrapper hands out

mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use common::*;
use ejb_bridge::provider::{
    namespaced_property, BindingKind, BindingProvider, Port, PortRefMetadata, PROVIDER_PROPERTY,
    WRAPPER_IMPLEMENTATION,
};
use ejb_bridge::{bootstrap, find_provider, BridgeError, ProviderRegistry, ProviderSources, Result};

/// Provider that stamps its own name into every port
struct Named(&'static str);

impl BindingProvider for Named {
    fn implementation(&self) -> &str {
        self.0
    }

    fn create_port(&self, sei: &str, binding: BindingKind) -> Result<Port> {
        let mut port = Port::new(sei, binding);
        port.request_context
            .insert("created.by".to_string(), self.0.to_string());
        Ok(port)
    }
}

fn named(name: &'static str) -> impl Fn() -> Result<Arc<dyn BindingProvider>> + Send + Sync {
    move || Ok(Arc::new(Named(name)) as Arc<dyn BindingProvider>)
}

fn registry() -> ProviderRegistry {
    ProviderRegistry::new()
        .with_provider("acme.Metro", named("acme.Metro"))
        .with_provider("acme.Axis", named("acme.Axis"))
        .with_provider("acme.Cxf", named("acme.Cxf"))
        .with_provider("acme.Broken", || {
            Err(BridgeError::ProviderConstruction {
                implementation: "acme.Broken".to_string(),
                reason: "missing license".to_string(),
            })
        })
        .with_provider("acme.Panicky", || -> Result<Arc<dyn BindingProvider>> {
            panic!("static initializer failed")
        })
}

fn runtime_file(test: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "bridge-{}-{}.properties",
        test,
        std::process::id()
    ));
    fs::write(&path, contents).unwrap();
    path
}

/// Test: every source is consulted in order until one yields a provider
#[test]
fn test_search_order() {
    init_logging();
    let registry = registry();
    let path = runtime_file(
        "search-order",
        "# runtime settings\nbinding.spi.Provider = acme.Cxf\n",
    );

    let all = ProviderSources::new()
        .with_property(namespaced_property(), "acme.Metro")
        .with_service_entry("acme.Axis")
        .with_runtime_properties(&path)
        .with_property(PROVIDER_PROPERTY, "acme.Cxf");
    assert_eq!(find_provider(&registry, &all).unwrap().0, "acme.Metro");

    let mut without_namespaced = all.clone();
    without_namespaced.properties.remove(&namespaced_property());
    assert_eq!(
        find_provider(&registry, &without_namespaced).unwrap().0,
        "acme.Axis"
    );

    let runtime_only = ProviderSources::new().with_runtime_properties(&path);
    assert_eq!(find_provider(&registry, &runtime_only).unwrap().0, "acme.Cxf");

    fs::remove_file(&path).unwrap();
}

/// Test: implementations that fail to construct fall through to the next source
#[test]
fn test_failed_candidates_skipped() {
    init_logging();
    let registry = registry();
    let sources = ProviderSources::new()
        .with_property(namespaced_property(), "acme.Broken")
        .with_service_entry("# comment only\n")
        .with_service_entry("acme.Panicky")
        .with_service_entry("acme.Unregistered")
        .with_runtime_properties(std::env::temp_dir().join("bridge-does-not-exist.properties"))
        .with_property(PROVIDER_PROPERTY, "acme.Axis");

    let (name, provider) = find_provider(&registry, &sources).unwrap();
    assert_eq!(name, "acme.Axis");
    assert_eq!(provider.implementation(), "acme.Axis");
}

/// Test: exhausting every source is a configuration failure
#[test]
fn test_nothing_found() {
    init_logging();
    let sources = ProviderSources::new()
        .with_service_entry(WRAPPER_IMPLEMENTATION)
        .with_property(PROVIDER_PROPERTY, "acme.Broken");

    assert!(matches!(
        find_provider(&registry(), &sources),
        Err(BridgeError::Configuration(_))
    ));
}

/// Test: the wrapper is first during bootstrap and resolves the real delegate
#[test]
fn test_bootstrap_delegates_past_wrapper() {
    init_logging();
    let registry = registry();
    let mut sources = ProviderSources::new()
        .with_service_entry("acme.Axis")
        .with_property(PROVIDER_PROPERTY, "acme.Metro");
    let port_refs = vec![
        PortRefMetadata::new("org.acme.Calculator")
            .with_mtom(true)
            .with_property("endpoint.address", "http://calc.test/ws"),
    ];

    let port = bootstrap(&registry, &mut sources, port_refs, |scope| {
        let seen = scope.sources();
        assert_eq!(seen.service_entries[0], WRAPPER_IMPLEMENTATION);
        assert_eq!(seen.property(PROVIDER_PROPERTY), Some(WRAPPER_IMPLEMENTATION));

        // the displaced standard value outranks the service registry
        let provider = scope.provider()?;
        assert_eq!(provider.delegate_name(), "acme.Metro");
        assert_eq!(provider.implementation(), WRAPPER_IMPLEMENTATION);
        provider.create_port("org.acme.Calculator", BindingKind::Soap12)
    })
    .unwrap();

    assert!(port.mtom_enabled);
    assert_eq!(
        port.request_context.get("endpoint.address").map(String::as_str),
        Some("http://calc.test/ws")
    );
    assert_eq!(
        port.request_context.get("created.by").map(String::as_str),
        Some("acme.Metro")
    );

    assert_eq!(sources.service_entries, vec!["acme.Axis".to_string()]);
    assert_eq!(sources.property(PROVIDER_PROPERTY), Some("acme.Metro"));
    assert_eq!(sources.property(&namespaced_property()), None);
}

/// Test: back-to-back bootstraps each see a clean overlay
#[test]
fn test_repeated_bootstraps() {
    init_logging();
    let registry = registry();
    let mut sources = ProviderSources::new().with_property(PROVIDER_PROPERTY, "acme.Cxf");

    for _ in 0..3 {
        let delegate = bootstrap(&registry, &mut sources, vec![], |scope| {
            assert_eq!(scope.sources().service_entries.len(), 1);
            Ok(scope.provider()?.delegate_name().to_string())
        })
        .unwrap();
        assert_eq!(delegate, "acme.Cxf");
    }

    let failed = bootstrap(&registry, &mut sources, vec![], |_| -> Result<()> {
        Err(BridgeError::Configuration("lookup aborted".to_string()))
    });
    assert!(failed.is_err());
    assert!(sources.service_entries.is_empty());
    assert_eq!(sources.properties.len(), 1);
}

/// Test: MTOM metadata is ignored on non-SOAP bindings
#[test]
fn test_mtom_requires_soap_binding() {
    init_logging();
    let registry = registry();
    let mut sources = ProviderSources::new().with_service_entry("acme.Axis");
    let port_refs = vec![PortRefMetadata::new("org.acme.Feed").with_mtom(true)];

    let port = bootstrap(&registry, &mut sources, port_refs, |scope| {
        scope.provider()?.create_port("org.acme.Feed", BindingKind::Http)
    })
    .unwrap();
    assert!(!port.mtom_enabled);
}
