//! protocol-grpctest - gRPC wire protocol for the `grpctest.GrpcTest` service.
//!
//! Provides the prost messages and tonic stubs for the service, bearer
//! credential handling, and adapters that let a session run over tonic
//! streams on either end:
//!
//! - [`GrpcTransport`] opens every stream shape from the client side
//! - [`RequestStream`] and [`ResponseSink`] wrap a server handler's streams

pub mod auth;
mod client;
pub mod convert;
pub mod proto;
mod server;

pub use auth::{SCHEME, auth_context, authorized, bearer_token};
pub use client::{
    ClientStream, GrpcTransport, IDLE_PING, IDLE_PING_TIMEOUT, Keepalive, RequestSender,
    ResponseStream,
};
pub use proto::grpc_test_client::GrpcTestClient;
pub use proto::grpc_test_server::{GrpcTest, GrpcTestServer};
pub use server::{RequestStream, ResponseCloser, ResponseOutput, ResponseSink, response_channel};
