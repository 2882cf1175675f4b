
//! receiver.rs
//! One-shot TCP receiver for a CSV payload.
//!
//! Protocol: the peer connects, sends the whole CSV as raw bytes, then
//! closes. End-of-stream is the only framing. The listener accepts exactly
//! one connection per call.
//!
//! A peer that sends data but never closes would hang the read loop forever;
//! a configurable read timeout turns that into a `Protocol` error. No ambient
//! state: everything the receiver needs arrives in `ReceiverConfig`.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, SockAddr, Socket, Type};
use log::info;

use crate::error::{PipelineError, Result};

const RECV_CHUNK: usize = 4096;

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub host: String,
    pub port: u16,
    /// Bounds a peer that sends data but never closes the connection.
    pub read_timeout: Option<Duration>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 12345,
            read_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// A bound listener waiting for its single connection.
pub struct CsvReceiver {
    listener: TcpListener,
    read_timeout: Option<Duration>,
}

impl CsvReceiver {
    /// Binds `host:port` with address reuse enabled.
    pub fn bind(cfg: &ReceiverConfig) -> Result<Self> {
        let addr: SocketAddr = (cfg.host.as_str(), cfg.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                PipelineError::Protocol(format!("cannot resolve {}:{}", cfg.host, cfg.port))
            })?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
        socket.set_reuse_address(true).ok();
        socket.bind(&SockAddr::from(addr))?;
        socket.listen(1)?;

        Ok(Self {
            listener: socket.into(),
            read_timeout: cfg.read_timeout,
        })
    }

    /// Address actually bound (useful when the config asked for port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Blocks for one connection, reads until the peer closes, decodes the
    /// payload as UTF-8. A read that times out before close, or a payload
    /// that is not text, is a `Protocol` error.
    pub fn receive(self) -> Result<String> {
        info!("waiting for one CSV connection...");
        let (mut stream, peer) = self.listener.accept()?;
        info!("connected by {peer}");
        stream.set_read_timeout(self.read_timeout)?;

        let mut payload = Vec::new();
        let mut chunk = [0u8; RECV_CHUNK];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => payload.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Err(PipelineError::Protocol(
                        "read timed out before the peer closed the connection".into(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("received {} bytes", payload.len());
        String::from_utf8(payload)
            .map_err(|_| PipelineError::Protocol("payload is not valid UTF-8".into()))
    }
}

/// Bind-and-receive in one call, for the common case.
pub fn receive_csv(cfg: &ReceiverConfig) -> Result<String> {
    CsvReceiver::bind(cfg)?.receive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpStream;
    use std::thread;

    fn loopback_config(timeout_ms: u64) -> ReceiverConfig {
        ReceiverConfig {
            host: "127.0.0.1".into(),
            port: 0, // OS-assigned, read back via local_addr
            read_timeout: Some(Duration::from_millis(timeout_ms)),
        }
    }

    #[test]
    fn payload_arrives_byte_for_byte() {
        let receiver = CsvReceiver::bind(&loopback_config(2000)).unwrap();
        let addr = receiver.local_addr().unwrap();

        let payload = "Time(s),NodeID,TxThroughput(bps),RxThroughput(bps),AvgDelay(s),LossRate(%)\n\
                       0.0,1,100.0,50.0,0.01,0.5\n";
        let sender = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(payload.as_bytes()).unwrap();
            // dropping the stream closes the connection: end-of-stream framing
        });

        let received = receiver.receive().unwrap();
        sender.join().unwrap();
        assert_eq!(received, payload);
    }

    #[test]
    fn peer_that_never_closes_hits_the_timeout() {
        let receiver = CsvReceiver::bind(&loopback_config(100)).unwrap();
        let addr = receiver.local_addr().unwrap();

        let sender = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"partial payload").unwrap();
            // keep the connection open past the receiver's timeout
            thread::sleep(Duration::from_millis(500));
        });

        match receiver.receive() {
            Err(PipelineError::Protocol(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected Protocol timeout, got {:?}", other.is_ok()),
        }
        sender.join().unwrap();
    }

    #[test]
    fn non_utf8_payload_is_a_protocol_error() {
        let receiver = CsvReceiver::bind(&loopback_config(2000)).unwrap();
        let addr = receiver.local_addr().unwrap();

        let sender = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&[0xff, 0xfe, 0xfd]).unwrap();
        });

        match receiver.receive() {
            Err(PipelineError::Protocol(msg)) => assert!(msg.contains("UTF-8")),
            other => panic!("expected Protocol error, got {:?}", other.is_ok()),
        }
        sender.join().unwrap();
    }
}
