//! Bridge Tests - SOAP calls end to end
//!
//! These tests drive the bridge through the SOAP adapter against a live
//! container and check:
//! - argument ordering and coercion as seen by the container
//! - the generic server fault and the classified cause behind it
//! - rewriting of local proxies into remote references
//! - the pivot rule on invocations driven by hand

mod common;

use std::sync::Arc;

use common::*;
use ejb_bridge::bridge::soap::{
    SoapAdapter, SoapRequest, SoapResponse, SERVER_FAULT_CODE, SERVER_FAULT_STRING,
};
use ejb_bridge::types::INTERNAL_MARSHAL_ERROR;
use ejb_bridge::{
    BridgeConfig, BridgeError, ContainerId, InboundCall, InterfaceType, Invocation, Outcome,
    ParameterDescriptor, ProxyRole, RemoteExceptionKind, SlotCollisionPolicy, StandardRefGenerator,
    SystemFaultKind, TransactionDemarcation, Value, WireParameter,
};

fn body_value(response: &SoapResponse) -> Value {
    match response {
        SoapResponse::Body(body) => body.return_value.clone(),
        SoapResponse::Fault(fault) => panic!("unexpected fault: {} ({})", fault, fault.cause()),
    }
}

/// Test: named parameters arriving out of order land in declared order
#[tokio::test]
async fn test_declared_order_wins_over_wire_order() {
    init_logging();
    let (bridge, container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let request = SoapRequest::new("concat")
        .with_param("third", "c")
        .with_param("first", "a")
        .with_param("second", "b");
    let response = bridge.handle(&soap, request).await;

    assert_eq!(body_value(&response), Value::String("a|b|c".into()));
    assert_eq!(
        container.seen.lock()[0],
        vec![Value::from("a"), Value::from("b"), Value::from("c")]
    );
}

/// Test: slots nobody supplied reach the container as absent
#[tokio::test]
async fn test_missing_parameters_are_absent() {
    init_logging();
    let (bridge, container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge
        .handle(&soap, SoapRequest::new("concat").with_param("second", "b"))
        .await;

    assert_eq!(body_value(&response), Value::String("_|b|_".into()));
    assert_eq!(
        container.seen.lock()[0],
        vec![Value::Absent, Value::from("b"), Value::Absent]
    );
}

/// Test: lexical values are coerced to the declared types
#[tokio::test]
async fn test_string_arguments_coerced() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge
        .handle(
            &soap,
            SoapRequest::new("add").with_param("b", " 5").with_param("a", "4"),
        )
        .await;
    assert_eq!(body_value(&response), Value::Int(9));
}

/// Test: an uncoercible argument never reaches the container
#[tokio::test]
async fn test_coercion_failure_is_marshal_fault() {
    init_logging();
    let (bridge, container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge
        .handle(
            &soap,
            SoapRequest::new("add").with_param("a", "four").with_param("b", 1),
        )
        .await;

    let fault = response.as_fault().expect("coercion failure faults");
    assert_eq!(fault.cause().kind(), RemoteExceptionKind::Marshal);
    assert_eq!(container.calls(), 0);
}

/// Test: a permission failure is a generic Server fault on the wire
#[tokio::test]
async fn test_no_permission_renders_generic_fault() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge.handle(&soap, SoapRequest::new("audit")).await;
    let fault = response.as_fault().expect("audit is refused");

    assert_eq!(fault.fault_code, SERVER_FAULT_CODE);
    assert_eq!(fault.fault_string, SERVER_FAULT_STRING);
    assert!(fault.detail.is_none());
    assert_eq!(fault.cause().kind(), RemoteExceptionKind::NoPermission);
    assert_eq!(
        fault.cause().system_fault().map(|f| f.kind),
        Some(SystemFaultKind::NoPermission)
    );

    let xml = response.to_xml();
    assert!(xml.contains("<faultcode>soapenv:Server</faultcode>"));
    assert!(xml.contains("<faultstring>Server Error</faultstring>"));
    assert!(!xml.contains("auditor"));
}

/// Test: unmasking the fault detail exposes the classification only
#[tokio::test]
async fn test_unmasked_detail() {
    init_logging();
    let config = BridgeConfig::builder()
        .endpoint(ENDPOINT)
        .mask_soap_fault_detail(false)
        .build();
    let (bridge, _container) = calculator_bridge(config);
    let soap = SoapAdapter::from_config(calculator_service(), bridge.config());

    let response = bridge.handle(&soap, SoapRequest::new("rollback")).await;
    let fault = response.as_fault().expect("rollback faults");
    assert_eq!(fault.fault_string, SERVER_FAULT_STRING);
    assert_eq!(
        fault.detail.as_deref(),
        Some("TransactionRolledBack: transaction marked rollback-only")
    );
}

/// Test: faults outside the fixed table fall back to Other and keep the cause
#[tokio::test]
async fn test_unmapped_fault_kept_as_cause() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge.handle(&soap, SoapRequest::new("unmapped")).await;
    let cause = response.as_fault().expect("unmapped faults").cause();
    assert_eq!(cause.kind(), RemoteExceptionKind::Other);
    assert_eq!(
        cause.system_fault().map(|f| f.kind),
        Some(SystemFaultKind::NoResources)
    );
}

/// Test: a returned home proxy leaves as a remote reference
#[tokio::test]
async fn test_home_proxy_rewritten() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge.handle(&soap, SoapRequest::new("home")).await;
    let Value::Reference(reference) = body_value(&response) else {
        panic!("home must be rewritten to a reference");
    };

    assert_eq!(reference.role, ProxyRole::Home);
    assert_eq!(reference.container_id, ContainerId::new(CALCULATOR));
    assert_eq!(reference.endpoint, ENDPOINT);
    assert_eq!(reference.type_id, "RMI:org.acme.CalculatorHome:0000000000000000");
    assert!(response.to_xml().contains("corbaloc:iiop:bridge.test:4201/"));
}

/// Test: proxies nested in lists and adapters are rewritten too
#[tokio::test]
async fn test_nested_proxies_rewritten() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge
        .handle(&soap, SoapRequest::new("create").with_param("name", "alice"))
        .await;
    let value = body_value(&response);
    assert!(!value.contains_local_proxy());

    let Value::List(items) = value else {
        panic!("create returns a list");
    };
    let [Value::Reference(instance), Value::Reference(home)] = items.as_slice() else {
        panic!("both list elements must be references: {:?}", items);
    };
    assert_eq!(instance.role, ProxyRole::Remote);
    assert_eq!(&instance.object_key[..], b"object/Calculator/alice");
    assert_eq!(home.role, ProxyRole::Home);
}

/// Test: a proxy for a container without a generator becomes a marshal fault
#[tokio::test]
async fn test_unregistered_container_fails_reply_marshaling() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge.handle(&soap, SoapRequest::new("foreignHome")).await;
    let cause = response.as_fault().expect("no generator for Ledger").cause();
    assert_eq!(cause.kind(), RemoteExceptionKind::Marshal);
    assert_eq!(cause.detail(), INTERNAL_MARSHAL_ERROR);

    bridge
        .register_reference_generator(
            ContainerId::new("Ledger"),
            Arc::new(StandardRefGenerator::new("Ledger", "ledger.test:4201")),
        )
        .unwrap();
    let response = bridge.handle(&soap, SoapRequest::new("foreignHome")).await;
    let Value::Reference(reference) = body_value(&response) else {
        panic!("Ledger home must now be rewritten");
    };
    assert_eq!(reference.endpoint, "ledger.test:4201");
}

/// Test: a panicking container still yields a response and the bridge keeps serving
#[tokio::test]
async fn test_container_panic_is_contained() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    let response = bridge.handle(&soap, SoapRequest::new("crash")).await;
    assert!(response.is_fault());

    let response = bridge
        .handle(&soap, SoapRequest::new("add").with_param("a", 1).with_param("b", 2))
        .await;
    assert_eq!(body_value(&response), Value::Int(3));
}

/// Test: operations the container cannot resolve are faults, not errors
#[tokio::test]
async fn test_unknown_operations() {
    init_logging();
    let (bridge, container) = calculator_bridge(default_config());
    let soap = soap_adapter();

    for operation in ["nope", "missing"] {
        let response = bridge.handle(&soap, SoapRequest::new(operation)).await;
        let cause = response.as_fault().expect("unknown operation faults").cause();
        assert_eq!(cause.kind(), RemoteExceptionKind::Other);
    }
    assert_eq!(container.calls(), 0);

    let stats = bridge.stats().snapshot();
    assert_eq!(stats.requests_received, 2);
    assert_eq!(stats.requests_faulted, 2);
}

/// Test: slot collisions follow the configured policy
#[tokio::test]
async fn test_slot_collision_policies() {
    init_logging();
    let call = || InboundCall {
        method_signature: ADD.to_string(),
        interface: InterfaceType::Local,
        parameters: vec![
            WireParameter::described(1, ParameterDescriptor::new().with_order(0)),
            WireParameter::described(10, ParameterDescriptor::new().with_order(0)),
            WireParameter::described(5, ParameterDescriptor::new().with_order(1)),
        ],
        expected_count: 2,
        wire_context: None,
    };

    let (rejecting, _) = calculator_bridge(default_config());
    let outcome = rejecting.invoke(call()).await;
    assert_eq!(
        outcome.as_fault().map(|f| f.kind()),
        Some(RemoteExceptionKind::Marshal)
    );

    let config = BridgeConfig::builder()
        .endpoint(ENDPOINT)
        .slot_collision(SlotCollisionPolicy::Overwrite)
        .build();
    let (overwriting, container) = calculator_bridge(config);
    let outcome = overwriting.invoke(call()).await;
    assert_eq!(outcome.as_result(), Some(&Value::Int(15)));
    assert_eq!(container.seen.lock()[0], vec![Value::Int(10), Value::Int(5)]);
}

/// Test: a container-managed deployment reaches the container as Container
#[tokio::test]
async fn test_container_demarcation_reaches_dispatch() {
    init_logging();
    let (bridge, container) =
        deployed_calculator(TransactionDemarcation::Container, default_config());
    let soap = soap_adapter();

    let response = bridge.handle(&soap, SoapRequest::new("beginTransaction")).await;
    let cause = response.as_fault().expect("container-managed refuses user transactions").cause();
    assert_eq!(cause.kind(), RemoteExceptionKind::InvalidTransaction);
    assert_eq!(container.calls(), 1);
}

/// Test: a bean-managed deployment reaches the container as Bean
#[tokio::test]
async fn test_bean_demarcation_reaches_dispatch() {
    init_logging();
    let (bridge, container) = deployed_calculator(TransactionDemarcation::Bean, default_config());
    let soap = soap_adapter();

    let response = bridge.handle(&soap, SoapRequest::new("beginTransaction")).await;
    assert_eq!(body_value(&response), Value::String("Bean".into()));
    assert_eq!(container.calls(), 1);
}

/// Test: nothing after pivot can dispatch again or replace the outcome
#[tokio::test]
async fn test_past_pivot_invocation_is_frozen() {
    init_logging();
    let (bridge, container) = calculator_bridge(default_config());

    let mut invocation = Invocation::new(0, InterfaceType::Remote, TransactionDemarcation::Container);
    invocation.bind_container(ContainerId::new(CALCULATOR)).unwrap();
    let outcome = bridge
        .execute(
            &mut invocation,
            vec![WireParameter::bare(2), WireParameter::bare(3)],
            2,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Result(Value::Int(5))));
    assert!(invocation.is_past_pivot());

    let redispatch = bridge.dispatch(&mut invocation).await;
    assert!(matches!(redispatch, Err(BridgeError::PastPivot(_))));

    let rerun = bridge
        .execute(&mut invocation, vec![WireParameter::bare(7), WireParameter::bare(7)], 2)
        .await;
    assert!(matches!(rerun, Err(BridgeError::PastPivot(_))));

    assert!(matches!(
        invocation.bind_container(ContainerId::new("Other")),
        Err(BridgeError::PastPivot(_))
    ));
    assert_eq!(invocation.outcome().and_then(Outcome::as_result), Some(&Value::Int(5)));
    assert_eq!(container.calls(), 1);
}
