//! Demonstrates the four gRPC call shapes (unary, server stream, client
//! stream, bidirectional) against a demo backend, and bridges them onto a
//! stateless HTTP surface plus an SSE push channel for the chat case.

pub mod bridge;
pub mod chat;
pub mod grpc;

pub mod demo_proto {
    include!(concat!(env!("OUT_DIR"), "/demo.rs"));
}
