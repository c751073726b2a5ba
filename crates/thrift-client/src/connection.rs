//! Socket, transport and protocol setup.
//!
//! The gateway must be started with the same transport (`-f` for framed) and
//! protocol (`-c` for compact) as configured here, otherwise the first call
//! fails with a transport or protocol error.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use hbase_thrift::hbase::HbaseSyncClient;
use hbseed_core::config::{ConnectionConfig, ThriftProtocol, ThriftTransport};
use hbseed_core::error::HbaseError;
use thrift::protocol::{
    TBinaryInputProtocol, TBinaryOutputProtocol, TCompactInputProtocol, TCompactOutputProtocol,
    TInputProtocol, TOutputProtocol,
};
use thrift::transport::{
    TBufferedReadTransport, TBufferedWriteTransport, TFramedReadTransport, TFramedWriteTransport,
    TIoChannel, TTcpChannel,
};
use tracing::debug;

pub type InputProtocol = Box<dyn TInputProtocol + Send>;
pub type OutputProtocol = Box<dyn TOutputProtocol + Send>;

/// Generated `Hbase` service client over the configured protocol pair.
pub type Rpc = HbaseSyncClient<InputProtocol, OutputProtocol>;

/// An open socket and the service client speaking over it.
pub struct Connection {
    addr: String,
    socket: TcpStream,
    pub(crate) rpc: Rpc,
}

impl Connection {
    /// Connects to `config.host:config.port`, trying every resolved address.
    pub fn open(config: &ConnectionConfig) -> Result<Self, HbaseError> {
        let addr = config.addr();
        let connection_error = |reason: String| HbaseError::Connection {
            addr: addr.clone(),
            reason,
        };

        let candidates: Vec<SocketAddr> = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| connection_error(e.to_string()))?
            .collect();
        let socket = connect_any(&candidates, config.timeout())
            .map_err(|e| connection_error(e.to_string()))?;

        socket
            .set_read_timeout(config.timeout())
            .and_then(|()| socket.set_write_timeout(config.timeout()))
            .and_then(|()| socket.set_nodelay(true))
            .map_err(|e| connection_error(e.to_string()))?;

        let control = socket
            .try_clone()
            .map_err(|e| connection_error(e.to_string()))?;
        let (input, output) = protocols(socket, config.transport, config.protocol)
            .map_err(|e| connection_error(e.to_string()))?;

        debug!(
            addr = %addr,
            transport = %config.transport,
            protocol = %config.protocol,
            "connected to thrift gateway"
        );
        Ok(Self {
            addr,
            socket: control,
            rpc: HbaseSyncClient::new(input, output),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Shuts the socket down in both directions.
    pub fn shutdown(&self) -> std::io::Result<()> {
        match self.socket.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Wraps an accepted or connected stream in the configured transport and
/// protocol. Used on both ends of a connection.
pub fn protocols(
    stream: TcpStream,
    transport: ThriftTransport,
    protocol: ThriftProtocol,
) -> thrift::Result<(InputProtocol, OutputProtocol)> {
    let (read_half, write_half) = TTcpChannel::with_stream(stream).split()?;

    let reader: Box<dyn Read + Send> = match transport {
        ThriftTransport::Buffered => Box::new(TBufferedReadTransport::new(read_half)),
        ThriftTransport::Framed => Box::new(TFramedReadTransport::new(read_half)),
    };
    let writer: Box<dyn Write + Send> = match transport {
        ThriftTransport::Buffered => Box::new(TBufferedWriteTransport::new(write_half)),
        ThriftTransport::Framed => Box::new(TFramedWriteTransport::new(write_half)),
    };

    let pair = match protocol {
        ThriftProtocol::Binary => {
            let input: InputProtocol = Box::new(TBinaryInputProtocol::new(reader, false));
            let output: OutputProtocol = Box::new(TBinaryOutputProtocol::new(writer, true));
            (input, output)
        }
        ThriftProtocol::Compact => {
            let input: InputProtocol = Box::new(TCompactInputProtocol::new(reader));
            let output: OutputProtocol = Box::new(TCompactOutputProtocol::new(writer));
            (input, output)
        }
    };
    Ok(pair)
}

fn connect_any(candidates: &[SocketAddr], timeout: Option<Duration>) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in candidates {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(addr = %addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "host resolved to no addresses",
        )
    }))
}
