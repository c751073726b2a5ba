//! In-process Thrift gateway backed by a `MemoryClient`.

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use hbseed_core::config::{ConnectionConfig, ThriftProtocol, ThriftTransport};
use hbseed_core::memory::MemoryClient;
use hbseed_thrift::gateway::{self, GatewayHandler};

pub struct FakeGateway {
    addr: SocketAddr,
    transport: ThriftTransport,
    protocol: ThriftProtocol,
    store: Arc<Mutex<MemoryClient>>,
}

impl FakeGateway {
    /// Buffered transport, binary protocol: the gateway defaults.
    pub fn start() -> Self {
        Self::with_store(
            MemoryClient::new(),
            ThriftTransport::Buffered,
            ThriftProtocol::Binary,
        )
    }

    pub fn with_store(
        store: MemoryClient,
        transport: ThriftTransport,
        protocol: ThriftProtocol,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake gateway");
        let addr = listener.local_addr().expect("fake gateway addr");
        let store = Arc::new(Mutex::new(store));

        let shared = Arc::clone(&store);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let store = Arc::clone(&shared);
                thread::spawn(move || {
                    // a client speaking another protocol ends its own connection only
                    let _ = gateway::serve(stream, transport, protocol, GatewayHandler::new(store));
                });
            }
        });

        Self {
            addr,
            transport,
            protocol,
            store,
        }
    }

    /// Client settings matching this gateway.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            transport: self.transport,
            protocol: self.protocol,
            timeout_ms: 5_000,
        }
    }

    pub fn store(&self) -> MutexGuard<'_, MemoryClient> {
        self.store.lock().expect("store lock")
    }
}
