//! Invocation Bridge Demo
//!
//! Hosts an in-memory shopping cart component behind the bridge and drives
//! it over both wire adapters:
//!
//! - concurrent SOAP `addItem` calls
//! - a SOAP call returning a home proxy (rewritten to a remote reference)
//! - a SOAP call the container refuses (generic `Server` fault)
//! - CORBA calls, including a checkout of an empty cart: rolled back and
//!   rendered as a system exception reply under container demarcation,
//!   answered with no order under bean demarcation
//! - a client-side provider bootstrap applying port-ref metadata
//!
//! Usage:
//!   cargo run -p bridge-demo -- --calls 20 --demarcation Bean --verbose

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ejb_bridge::bridge::corba::{CorbaAdapter, CorbaOperation, CorbaRequest};
use ejb_bridge::bridge::soap::{OperationDesc, ServiceDesc, SoapAdapter, SoapMessageContext, SoapRequest};
use ejb_bridge::invocation::InvocationKey;
use ejb_bridge::provider::{
    BindingKind, BindingProvider, Port, PortRefMetadata, PROVIDER_PROPERTY,
};
use ejb_bridge::types::generate_object_key;
use ejb_bridge::{
    bootstrap, BridgeConfig, ContainerDispatcher, DeploymentInfo, DispatchError, InterfaceType,
    Invocation, InvocationBridge, LocalProxy, MethodTable, ProviderRegistry, ProviderSources,
    ProxyInfo, RefGeneratorRegistry, SlotCollisionPolicy, SystemFault, SystemFaultKind,
    TransactionDemarcation, Value, ValueType,
};

const CONTAINER_ID: &str = "ShoppingCart";

const ADD_ITEM: &str = "addItem(java.lang.String,int)";
const GET_TOTAL: &str = "getTotal()";
const GET_HOME: &str = "getHome()";
const LIST_ITEMS: &str = "listItems()";
const CHECKOUT: &str = "checkout()";
const AUDIT: &str = "audit()";

/// In-memory cart container
struct CartContainer {
    methods: MethodTable,
    items: Mutex<BTreeMap<String, i32>>,
}

impl CartContainer {
    fn new() -> Self {
        Self {
            methods: MethodTable::from_signatures([
                ADD_ITEM, GET_TOTAL, GET_HOME, LIST_ITEMS, CHECKOUT, AUDIT,
            ]),
            items: Mutex::new(BTreeMap::new()),
        }
    }

    fn home_info() -> ProxyInfo {
        ProxyInfo::new(CONTAINER_ID)
            .with_home_interface("org.acme.cart.CartHome")
            .with_remote_interface("org.acme.cart.Cart")
    }
}

#[async_trait]
impl ContainerDispatcher for CartContainer {
    fn method_index_for(&self, signature: &str) -> Option<usize> {
        self.methods.index_of(signature)
    }

    async fn dispatch(&self, invocation: &mut Invocation) -> Result<Value, DispatchError> {
        if let Some(ctx) = invocation.get_as::<SoapMessageContext>(InvocationKey::WireContext) {
            tracing::debug!("SOAP call {} on {}", ctx.operation, ctx.service);
        }

        let signature = self.methods.signature(invocation.method_index()).unwrap_or("?");
        match signature {
            ADD_ITEM => {
                let (Some(Value::String(item)), Some(Value::Int(quantity))) =
                    (invocation.arguments().first(), invocation.arguments().get(1))
                else {
                    return Err(Box::new(SystemFault::new(
                        SystemFaultKind::BadParam,
                        "addItem needs an item and a quantity",
                    )));
                };
                let mut items = self.items.lock();
                let count = items.entry(item.clone()).or_insert(0);
                *count += quantity;
                Ok(Value::Int(*count))
            }
            GET_TOTAL => {
                let total: i64 = self.items.lock().values().map(|q| i64::from(*q)).sum();
                Ok(Value::Long(total))
            }
            GET_HOME => Ok(Value::Proxy(LocalProxy::home(Self::home_info()))),
            LIST_ITEMS => Ok(Value::List(
                self.items
                    .lock()
                    .keys()
                    .map(|k| Value::String(k.clone()))
                    .collect(),
            )),
            CHECKOUT => {
                let mut items = self.items.lock();
                if items.is_empty() {
                    // a bean-managed cart ends its own transaction and reports no order
                    if invocation.demarcation().is_bean_managed() {
                        return Ok(Value::Null);
                    }
                    return Err(Box::new(SystemFault::new(
                        SystemFaultKind::TransactionRolledBack,
                        "cart is empty",
                    )));
                }
                items.clear();
                let order = Self::home_info().with_primary_key(generate_object_key());
                Ok(Value::Adapter(Box::new(Value::Proxy(LocalProxy::remote(order)))))
            }
            _ => Err(Box::new(SystemFault::new(
                SystemFaultKind::NoPermission,
                "caller is not in role auditor",
            ))),
        }
    }
}

/// Binding provider that hands out plain HTTP ports
struct HttpBinding;

impl BindingProvider for HttpBinding {
    fn implementation(&self) -> &str {
        "demo.HttpBinding"
    }

    fn create_port(&self, sei: &str, binding: BindingKind) -> ejb_bridge::Result<Port> {
        Ok(Port::new(sei, binding))
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CollisionPolicy {
    Reject,
    Overwrite,
}

impl From<CollisionPolicy> for SlotCollisionPolicy {
    fn from(policy: CollisionPolicy) -> Self {
        match policy {
            CollisionPolicy::Reject => SlotCollisionPolicy::Reject,
            CollisionPolicy::Overwrite => SlotCollisionPolicy::Overwrite,
        }
    }
}

#[derive(Parser)]
#[command(name = "bridge-demo")]
#[command(about = "Invocation bridge demo with an in-memory cart container")]
struct Args {
    /// Handling of parameters that claim the same argument slot
    #[arg(long, value_enum, default_value = "reject")]
    collision_policy: CollisionPolicy,

    /// Transaction demarcation of the cart (Container or Bean)
    #[arg(long, default_value = "Container")]
    demarcation: TransactionDemarcation,

    /// Number of concurrent addItem calls
    #[arg(short, long, default_value = "10")]
    calls: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn cart_service() -> ServiceDesc {
    ServiceDesc::new("CartService", "urn:acme:cart")
        .with_operation(
            OperationDesc::new("addItem", ADD_ITEM)
                .param("item", ValueType::String)
                .param("quantity", ValueType::Int)
                .returns(ValueType::Int),
        )
        .with_operation(OperationDesc::new("getTotal", GET_TOTAL).returns(ValueType::Long))
        .with_operation(OperationDesc::new("getHome", GET_HOME))
        .with_operation(OperationDesc::new("audit", AUDIT))
}

fn cart_servant() -> CorbaAdapter {
    CorbaAdapter::new([
        CorbaOperation::new("getTotal", GET_TOTAL),
        CorbaOperation::new("listItems", LIST_ITEMS),
        CorbaOperation::new("checkout", CHECKOUT),
        CorbaOperation::new("audit", AUDIT),
    ])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = BridgeConfig::builder()
        .slot_collision(args.collision_policy.into())
        .build();
    let bridge = InvocationBridge::with_config(
        DeploymentInfo::new(CONTAINER_ID, args.demarcation),
        Arc::new(CartContainer::new()),
        Arc::new(RefGeneratorRegistry::new()),
        config,
    );
    bridge.deploy_standard_generator()?;
    info!(
        "Deployed {} ({}-managed transactions)",
        CONTAINER_ID, args.demarcation
    );

    // SOAP
    let soap = SoapAdapter::from_config(cart_service(), bridge.config());
    let fruit = ["apple", "pear", "plum"];
    let calls = (0..args.calls).map(|i| {
        let request = SoapRequest::new("addItem")
            .with_param("quantity", (i % 3 + 1) as i32)
            .with_param("item", fruit[i % fruit.len()]);
        bridge.handle(&soap, request)
    });
    let responses = join_all(calls).await;
    let faults = responses.iter().filter(|r| r.is_fault()).count();
    info!("{} addItem calls, {} faults", responses.len(), faults);

    let total = bridge.handle(&soap, SoapRequest::new("getTotal")).await;
    info!("getTotal -> {}", total.to_xml());

    let home = bridge.handle(&soap, SoapRequest::new("getHome")).await;
    info!("getHome -> {}", home.to_xml());

    let denied = bridge.handle(&soap, SoapRequest::new("audit")).await;
    if let Some(fault) = denied.as_fault() {
        info!("audit -> {} (cause: {})", fault, fault.cause().kind());
    }

    // CORBA
    let servant = cart_servant();
    let object_key = b"object/ShoppingCart".to_vec();
    let items = bridge
        .handle(
            &servant,
            CorbaRequest::new(1, object_key.clone(), InterfaceType::Remote, "listItems"),
        )
        .await;
    info!("listItems -> {:?}", items.result());

    for request_id in [2, 3] {
        let reply = bridge
            .handle(
                &servant,
                CorbaRequest::new(request_id, object_key.clone(), InterfaceType::Remote, "checkout"),
            )
            .await;
        let encoded = reply.encode(true)?;
        match reply.system_exception() {
            Some(ex) => info!(
                "checkout #{} -> {} minor {} {}: {} ({} bytes)",
                request_id,
                ex.repository_id,
                ex.minor,
                ex.completed,
                ex.message,
                encoded.len()
            ),
            None => info!(
                "checkout #{} -> {:?} ({} bytes)",
                request_id,
                reply.result().map(ToString::to_string),
                encoded.len()
            ),
        }
    }

    // Client bootstrap
    let registry = ProviderRegistry::new().with_provider("demo.HttpBinding", || {
        Ok(Arc::new(HttpBinding) as Arc<dyn BindingProvider>)
    });
    let mut sources = ProviderSources::new().with_property(PROVIDER_PROPERTY, "demo.HttpBinding");
    let port_refs = vec![PortRefMetadata::new("org.acme.cart.CartService")
        .with_mtom(true)
        .with_property("endpoint.address", "http://localhost:8080/cart")];
    let port = bootstrap(&registry, &mut sources, port_refs, |scope| {
        let provider = scope.provider()?;
        info!("Bootstrap resolved delegate {}", provider.delegate_name());
        provider.create_port("org.acme.cart.CartService", BindingKind::Soap11)
    })?;
    info!(
        "Client port {} over {}: mtom={}, context={:?}",
        port.service_endpoint_interface, port.binding, port.mtom_enabled, port.request_context
    );

    let stats = bridge.stats().snapshot();
    info!(
        "Requests: {} received, {} succeeded, {} faulted",
        stats.requests_received, stats.requests_succeeded, stats.requests_faulted
    );

    Ok(())
}
