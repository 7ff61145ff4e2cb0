//! CORBA Tests - reference-bound requests end to end
//!
//! These tests drive the bridge through the CORBA adapter and check the
//! reply as it would travel back: results, system exception bodies and
//! their encoding in both byte orders.

mod common;

use bytes::Bytes;

use common::*;
use ejb_bridge::bridge::corba::{CorbaReply, CorbaRequest, REPLY_NO_EXCEPTION, REPLY_SYSTEM_EXCEPTION};
use ejb_bridge::types::INTERNAL_MARSHAL_ERROR;
use ejb_bridge::{BridgeError, CompletionStatus, InterfaceType, ProxyRole, SystemFaultKind, Value};

const OBJECT_KEY: &[u8] = b"object/Calculator/1";

fn request(id: u32, target: InterfaceType, operation: &str) -> CorbaRequest {
    CorbaRequest::new(id, Bytes::from_static(OBJECT_KEY), target, operation)
}

/// Test: positional arguments are coerced and the result travels back
#[tokio::test]
async fn test_add_round_trip() {
    init_logging();
    let (bridge, container) = calculator_bridge(default_config());
    let servant = corba_adapter();

    let reply = bridge
        .handle(&servant, request(7, InterfaceType::Remote, "add").arg(2).arg(40i64))
        .await;
    assert_eq!(reply.request_id, 7);
    assert_eq!(reply.reply_status(), REPLY_NO_EXCEPTION);
    assert_eq!(reply.result(), Some(&Value::Int(42)));
    assert_eq!(container.seen.lock()[0], vec![Value::Int(2), Value::Int(40)]);

    for little_endian in [true, false] {
        let decoded = CorbaReply::decode(reply.encode(little_endian).unwrap()).unwrap();
        assert_eq!(decoded, reply);
    }
}

/// Test: a home proxy result is encoded as a remote reference
#[tokio::test]
async fn test_home_reference_reply() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let servant = corba_adapter();

    let reply = bridge
        .handle(&servant, request(1, InterfaceType::Home, "home"))
        .await;
    let Some(Value::Reference(reference)) = reply.result() else {
        panic!("expected a reference, got {:?}", reply);
    };
    assert_eq!(reference.role, ProxyRole::Home);
    assert_eq!(reference.endpoint, ENDPOINT);

    let decoded = CorbaReply::decode(reply.encode(false).unwrap()).unwrap();
    assert_eq!(decoded.result(), reply.result());
}

/// Test: container faults become system exception replies with their own code
#[tokio::test]
async fn test_system_exception_replies() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let servant = corba_adapter();

    let cases = [
        ("audit", SystemFaultKind::NoPermission),
        ("rollback", SystemFaultKind::TransactionRolledBack),
        ("unmapped", SystemFaultKind::NoResources),
        ("nope", SystemFaultKind::BadOperation),
    ];
    for (id, (operation, kind)) in cases.into_iter().enumerate() {
        let reply = bridge
            .handle(&servant, request(id as u32, InterfaceType::Remote, operation))
            .await;
        assert_eq!(reply.reply_status(), REPLY_SYSTEM_EXCEPTION);

        let ex = reply.system_exception().expect("system exception body");
        assert_eq!(ex.kind(), Some(kind), "operation {}", operation);
        assert_eq!(ex.repository_id, kind.repository_id());

        let decoded = CorbaReply::decode(reply.encode(true).unwrap()).unwrap();
        assert_eq!(decoded, reply);
    }
}

/// Test: reply marshaling failures complete with status YES
#[tokio::test]
async fn test_reference_failure_is_marshal_completed_yes() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let servant = corba_adapter();

    let reply = bridge
        .handle(&servant, request(3, InterfaceType::Remote, "foreignHome"))
        .await;
    let ex = reply.system_exception().expect("no generator for Ledger");
    assert_eq!(ex.kind(), Some(SystemFaultKind::Marshal));
    assert_eq!(ex.completed, CompletionStatus::Yes);
    assert_eq!(ex.message, INTERNAL_MARSHAL_ERROR);
}

/// Test: requests bound to a servant IIOP cannot reach are refused up front
#[tokio::test]
async fn test_web_service_target_refused() {
    init_logging();
    let (bridge, container) = calculator_bridge(default_config());
    let servant = corba_adapter();

    let reply = bridge
        .handle(&servant, request(4, InterfaceType::WebService, "add").arg(1).arg(1))
        .await;
    let ex = reply.system_exception().expect("web service target is refused");
    assert_eq!(ex.kind(), Some(SystemFaultKind::Marshal));
    assert_eq!(ex.completed, CompletionStatus::No);
    assert_ne!(ex.message, INTERNAL_MARSHAL_ERROR);
    assert_eq!(container.calls(), 0);
}

/// Test: a truncated reply is rejected, not misread
#[tokio::test]
async fn test_truncated_reply_rejected() {
    init_logging();
    let (bridge, _container) = calculator_bridge(default_config());
    let servant = corba_adapter();

    let reply = bridge
        .handle(&servant, request(5, InterfaceType::Remote, "audit"))
        .await;
    let encoded = reply.encode(true).unwrap();
    let truncated = encoded.slice(..encoded.len() - 3);

    assert!(matches!(
        CorbaReply::decode(truncated),
        Err(BridgeError::BufferUnderflow { .. })
    ));
}
