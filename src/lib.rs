//! Hyperion — a length-framed, chunked message protocol over a reliable
//! byte-stream transport.
//!
//! This crate is the protocol's core: chunked framing, the adaptive
//! lightweight/direct/chunked dispatcher, and their supporting wire,
//! header, serializer, and error primitives. It makes no assumption about
//! how a transport is acquired (TCP listener/connect, TLS, timeouts are
//! all external concerns) and carries no reliability, encryption, or
//! multiplexing of its own — a message is delivered whole or not at all.
//!
//! Two engines are exposed, sharing one chunked implementation so their
//! wire formats stay bit-compatible:
//!
//! - [`PlainEngine`] always sends and receives chunked packets.
//! - [`SmartEngine`] additionally picks lightweight or direct mode for
//!   small and medium payloads, falling back to the same chunked path for
//!   anything at or above 64 KiB.
//!
//! Both are generic over a [`Serializer`], which converts an application
//! value to and from the opaque byte buffers the framing layer transports.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

mod chunked;
mod dispatcher;
mod error;
mod header;
mod serializer;
mod stats;
mod wire;

pub use chunked::PlainEngine;
pub use dispatcher::{SmartEngine, DIRECT_MAX, LIGHTWEIGHT_MAX};
pub use error::{Error, Result};
pub use header::{ChunkHeader, CHUNK_SIZE, HEADER_LENGTH_MAX, HEADER_LENGTH_MIN, MAGIC};
pub use serializer::{BytesSerializer, JsonSerializer, Serializer, Utf8Serializer};
pub use stats::EngineStats;

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let accept = listener.accept();
        let (client, (server, _)) = tokio::join!(connect, accept);
        (client.unwrap(), server)
    }

    #[tokio::test]
    async fn smart_engine_round_trips_over_real_sockets() {
        let (mut client, mut server) = loopback_pair().await;

        let mut sender: SmartEngine<String, _> = SmartEngine::new(Utf8Serializer);
        let mut receiver: SmartEngine<String, _> = SmartEngine::new(Utf8Serializer);
        let message = "round trip over a real socket".to_string();

        let message_clone = message.clone();
        let send_task =
            tokio::spawn(async move { sender.send(&message_clone, &mut client, None).await });
        let received = receiver.receive(&mut server, None).await.unwrap();
        send_task.await.unwrap().unwrap();

        assert_eq!(received, message);
    }

    #[tokio::test]
    async fn ten_concurrent_connections_do_not_cross_talk() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            for _ in 0..10 {
                let (mut socket, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    let mut engine: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
                    let value = engine.receive(&mut socket, None).await.unwrap();
                    engine.send(&value, &mut socket, None).await.unwrap();
                });
            }
        });

        let mut clients = Vec::new();
        for i in 0..10u8 {
            clients.push(tokio::spawn(async move {
                let mut socket = TcpStream::connect(addr).await.unwrap();
                let mut engine: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
                let payload = vec![i; 100 + usize::from(i)];
                engine.send(&payload, &mut socket, None).await.unwrap();
                let echoed = engine.receive(&mut socket, None).await.unwrap();
                assert_eq!(echoed, payload);
            }));
        }

        for client in clients {
            client.await.unwrap();
        }
        server.await.unwrap();
    }
}
