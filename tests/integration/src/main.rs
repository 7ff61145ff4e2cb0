//! Integration harness
//!
//! Smoke-checks one calculator bridge in process, then runs the integration
//! suites (all of them, or those matching the filters given) as separate
//! `cargo test` processes and reports how many tests each one passed.
//!
//! ```text
//! cargo run -p integration-tests
//! cargo run -p integration-tests -- corba provider
//! cargo run -p integration-tests -- --list
//! RUST_LOG=debug cargo run -p integration-tests -- --smoke-only
//! ```


use std::process::{Command, ExitCode};
use std::time::{Duration, Instant};

use bytes::Bytes;
use clap::Parser;

use common::*;
use ejb_bridge::bridge::corba::CorbaRequest;
use ejb_bridge::bridge::soap::{SoapRequest, SoapResponse};
use ejb_bridge::bridge::BridgeStatsSnapshot;
use ejb_bridge::InterfaceType;

/// Suite target and what it covers
const SUITES: &[(&str, &str)] = &[
    ("bridge_tests", "SOAP ordering, coercion, faults, rewriting, demarcation"),
    ("corba_tests", "IIOP replies, system exceptions, reply encoding"),
    ("concurrency_tests", "shared bridge under parallel callers, registry churn"),
    ("provider_tests", "client bootstrap provider resolution"),
];

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Smoke-check the invocation bridge and run its integration suites")]
struct Args {
    /// Run only suites whose name contains one of these filters
    filters: Vec<String>,

    /// List the suites and exit
    #[arg(long)]
    list: bool,

    /// Stop after the in-process smoke pass
    #[arg(long)]
    smoke_only: bool,
}

struct SuiteRun {
    name: &'static str,
    passed: bool,
    tests: Option<usize>,
    elapsed: Duration,
}

fn describe(response: &SoapResponse) -> String {
    match response {
        SoapResponse::Body(body) => body.return_value.to_string(),
        SoapResponse::Fault(fault) => format!("fault ({})", fault.cause().kind()),
    }
}

/// Drive a few calls over both adapters and return the bridge counters
async fn smoke() -> BridgeStatsSnapshot {
    let (bridge, _container) = calculator_bridge(default_config());
    let soap = soap_adapter();
    let servant = corba_adapter();

    let soap_calls = [
        SoapRequest::new("add").with_param("b", 2).with_param("a", 40),
        SoapRequest::new("home"),
        SoapRequest::new("audit"),
    ];
    for request in soap_calls {
        let operation = request.operation.clone();
        let response = bridge.handle(&soap, request).await;
        println!("  soap  {:<10} {}", operation, describe(&response));
    }

    let object_key = Bytes::from_static(b"object/Calculator");
    let corba_calls = [
        CorbaRequest::new(1, object_key.clone(), InterfaceType::Remote, "create").arg("smoke"),
        CorbaRequest::new(2, object_key, InterfaceType::Remote, "rollback"),
    ];
    for request in corba_calls {
        let operation = request.operation.clone();
        let reply = bridge.handle(&servant, request).await;
        let outcome = match (reply.result(), reply.system_exception()) {
            (Some(value), _) => value.to_string(),
            (None, Some(ex)) => format!("{} ({})", ex.repository_id, ex.completed),
            (None, None) => "empty reply".to_string(),
        };
        println!("  iiop  {:<10} {}", operation, outcome);
    }

    bridge.stats().snapshot()
}

/// Sum the `N passed` counts of every `test result:` line
fn passed_tests(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("test result: "))
        .filter_map(|rest| rest.split(". ").nth(1)?.split_whitespace().next()?.parse().ok())
        .fold(None, |total, n: usize| Some(total.unwrap_or(0) + n))
}

fn run_suite(name: &'static str) -> SuiteRun {
    let start = Instant::now();
    let output = Command::new("cargo")
        .args(["test", "-p", "integration-tests", "--test", name])
        .output();
    let elapsed = start.elapsed();

    match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !output.status.success() {
                print!("{}", stdout);
                eprint!("{}", String::from_utf8_lossy(&output.stderr));
            }
            SuiteRun {
                name,
                passed: output.status.success(),
                tests: passed_tests(&stdout),
                elapsed,
            }
        }
        Err(e) => {
            eprintln!("cannot launch cargo for {}: {}", name, e);
            SuiteRun {
                name,
                passed: false,
                tests: None,
                elapsed,
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list {
        for (name, covers) in SUITES {
            println!("{:<20} {}", name, covers);
        }
        return ExitCode::SUCCESS;
    }

    init_logging();
    println!("smoke pass");
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("cannot start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let stats = runtime.block_on(smoke());
    println!(
        "  {} received, {} succeeded, {} faulted",
        stats.requests_received, stats.requests_succeeded, stats.requests_faulted
    );
    if stats.requests_received != stats.requests_succeeded + stats.requests_faulted {
        eprintln!("bridge lost track of a request");
        return ExitCode::FAILURE;
    }
    if args.smoke_only {
        return ExitCode::SUCCESS;
    }

    let selected: Vec<&'static str> = SUITES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| args.filters.is_empty() || args.filters.iter().any(|f| name.contains(f.as_str())))
        .collect();
    if selected.is_empty() {
        eprintln!("no suite matches {:?}", args.filters);
        return ExitCode::FAILURE;
    }

    let runs: Vec<SuiteRun> = selected.into_iter().map(run_suite).collect();

    println!();
    for run in &runs {
        let tests = run.tests.map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "{:<20} {:<5} {:>4} tests  {:?}",
            run.name,
            if run.passed { "ok" } else { "FAIL" },
            tests,
            run.elapsed
        );
    }

    if runs.iter().all(|run| run.passed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
