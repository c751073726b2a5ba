//! ThriftClient against an in-process gateway
//!
//! - full seed run over the wire, first run and re-run
//! - every transport/protocol combination
//! - scanner paging, limits and cleanup
//! - error mapping: already exists, server IOError, unreachable gateway

mod common;

use std::net::{TcpListener, TcpStream};

use hbase_thrift::hbase::{HbaseSyncClient, THbaseSyncClient};

use common::FakeGateway;
use hbseed_core::client::HbaseClient;
use hbseed_core::config::{ConnectionConfig, HbseedConfig, ThriftProtocol, ThriftTransport};
use hbseed_core::error::HbaseError;
use hbseed_core::memory::MemoryClient;
use hbseed_core::seed::{self, SeedPlan};
use hbseed_core::table::{BatchOptions, Table};
use hbseed_core::types::{ColumnFamily, ScanSpec};
use hbseed_thrift::ThriftClient;
use hbseed_thrift::connection::protocols;

fn demo_plan() -> SeedPlan {
    SeedPlan::from_config(&HbseedConfig::default())
}

fn connect(gateway: &FakeGateway) -> ThriftClient {
    ThriftClient::connect(&gateway.config()).expect("connect to fake gateway")
}

// =============================================================================
// seed over the wire
// =============================================================================

#[test]
fn seed_creates_table_and_rows() {
    let gateway = FakeGateway::start();
    let mut client = connect(&gateway);

    let outcome = seed::run(&mut client, &demo_plan()).expect("seed should succeed");
    client.close().expect("close");

    assert!(outcome.created);
    assert_eq!(outcome.written.mutations, 6);
    let lines: Vec<String> = outcome.rows.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "row1 {job_data:position=Engineer, personal_data:age=30, personal_data:name=John Doe}",
            "row2 {job_data:position=Manager, personal_data:age=28, personal_data:name=Jane Smith}",
        ]
    );

    let mut store = gateway.store();
    assert_eq!(store.table_names().expect("tables"), vec!["employees1"]);
    let row1 = store
        .get_row("employees1", b"row1")
        .expect("get")
        .expect("row1 stored");
    assert_eq!(row1.text("personal_data:name").as_deref(), Some("John Doe"));
    assert_eq!(store.open_scanners(), 0, "scanner closed over the wire");
}

#[test]
fn rerun_reports_existing_table_and_keeps_values() {
    let gateway = FakeGateway::start();

    let first = {
        let mut client = connect(&gateway);
        seed::run(&mut client, &demo_plan()).expect("first run")
    };
    let second = {
        let mut client = connect(&gateway);
        seed::run(&mut client, &demo_plan()).expect("second run")
    };

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.rows.len(), 2);
    for (a, b) in first.rows.iter().zip(&second.rows) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.text_map(), b.text_map());
    }
}

#[test]
fn seed_works_with_every_transport_and_protocol() {
    for transport in [ThriftTransport::Buffered, ThriftTransport::Framed] {
        for protocol in [ThriftProtocol::Binary, ThriftProtocol::Compact] {
            let gateway = FakeGateway::with_store(MemoryClient::new(), transport, protocol);
            let mut client = connect(&gateway);
            let outcome = seed::run(&mut client, &demo_plan())
                .unwrap_or_else(|e| panic!("{transport}/{protocol}: {e}"));
            assert_eq!(outcome.rows.len(), 2, "{transport}/{protocol}");
        }
    }
}

// =============================================================================
// individual calls
// =============================================================================

#[test]
fn create_existing_table_maps_to_table_already_exists() {
    let gateway = FakeGateway::start();
    let mut client = connect(&gateway);
    let families = [ColumnFamily::new("job_data")];

    client.create_table("employees1", &families).expect("create");
    let err = client
        .create_table("employees1", &families)
        .expect_err("second create");
    assert!(matches!(err, HbaseError::TableAlreadyExists(ref t) if t == "employees1"));
}

#[test]
fn column_families_come_back_without_colon() {
    let gateway = FakeGateway::start();
    let mut client = connect(&gateway);
    seed::run(&mut client, &demo_plan()).expect("seed");

    let families = client.column_families("employees1").expect("describe");
    assert_eq!(
        families.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["job_data", "personal_data"]
    );
    assert_eq!(families["personal_data"].max_versions, Some(3));
    assert_eq!(families["job_data"].max_versions, Some(3));
}

#[test]
fn scanner_pages_through_rows_and_honours_limit() {
    let gateway = FakeGateway::start();
    let mut client = connect(&gateway);
    client
        .create_table("numbers", &[ColumnFamily::new("n")])
        .expect("create");

    let mut table = Table::new(&mut client, "numbers");
    table
        .with_batch(BatchOptions::default(), |batch| {
            for i in 0..7 {
                batch.put(format!("k{i}"), [("n:v", i.to_string())])?;
            }
            Ok(())
        })
        .expect("fill");

    let all = table
        .scan(ScanSpec {
            caching: 3,
            ..ScanSpec::default()
        })
        .expect("scan")
        .collect::<Result<Vec<_>, _>>()
        .expect("rows");
    assert_eq!(all.len(), 7);

    let limited = table
        .scan(ScanSpec {
            caching: 2,
            limit: Some(3),
            ..ScanSpec::default()
        })
        .expect("scan")
        .collect::<Result<Vec<_>, _>>()
        .expect("rows");
    assert_eq!(
        limited.iter().map(|r| r.key_lossy().into_owned()).collect::<Vec<_>>(),
        vec!["k0", "k1", "k2"]
    );

    assert!(table.row("k6").expect("get").is_some());
    assert!(table.row("k7").expect("get").is_none());
    drop(table);
    assert_eq!(gateway.store().open_scanners(), 0);
}

#[test]
fn server_io_error_propagates() {
    let gateway = FakeGateway::with_store(
        MemoryClient::new().with_failing_writes(),
        ThriftTransport::Buffered,
        ThriftProtocol::Binary,
    );
    let mut client = connect(&gateway);
    let err = seed::run(&mut client, &demo_plan()).expect_err("writes fail");
    assert!(matches!(err, HbaseError::ServerIo(_)));
}

#[test]
fn scan_of_missing_table_is_a_server_error() {
    let gateway = FakeGateway::start();
    let mut client = connect(&gateway);
    let err = client
        .open_scanner("missing", &ScanSpec::default())
        .expect_err("no such table");
    assert!(matches!(err, HbaseError::ServerIo(_)));
}

// =============================================================================
// connection lifecycle
// =============================================================================

#[test]
fn close_is_idempotent_and_blocks_further_calls() {
    let gateway = FakeGateway::start();
    let mut client = connect(&gateway);
    assert!(client.addr().is_some());

    client.close().expect("first close");
    client.close().expect("second close");
    assert!(client.addr().is_none());
    assert!(matches!(
        client.table_names(),
        Err(HbaseError::ConnectionClosed)
    ));
}

#[test]
fn unreachable_gateway_fails_with_connection_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let config = ConnectionConfig {
        host: "127.0.0.1".to_owned(),
        port,
        ..ConnectionConfig::default()
    };
    let err = ThriftClient::connect(&config).err().expect("nothing listens");
    assert!(err.is_connection());
}

#[test]
fn protocol_mismatch_is_an_error_not_a_hang() {
    let gateway = FakeGateway::start();
    let config = ConnectionConfig {
        protocol: ThriftProtocol::Compact,
        ..gateway.config()
    };
    let mut client = ThriftClient::connect(&config).expect("tcp connect still works");
    let err = client.table_names().expect_err("gateway speaks binary");
    assert!(matches!(
        err,
        HbaseError::Transport(_) | HbaseError::Protocol(_)
    ));
}

#[test]
fn methods_outside_the_seed_flow_are_refused_over_the_wire() {
    let gateway = FakeGateway::start();
    let config = gateway.config();
    let stream = TcpStream::connect((config.host.as_str(), config.port)).expect("connect");
    let (input, output) =
        protocols(stream, config.transport, config.protocol).expect("protocol pair");
    let mut raw = HbaseSyncClient::new(input, output);

    let err = raw
        .delete_table(b"employees1".to_vec())
        .expect_err("deleteTable is not served");
    assert!(
        matches!(err, thrift::Error::Application(ref e) if e.kind == thrift::ApplicationErrorKind::UnknownMethod),
        "{err:?}"
    );

    // the connection stays usable after a refused call
    assert!(raw.get_table_names().expect("table names").is_empty());
}
