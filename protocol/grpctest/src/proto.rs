//! Wire messages and generated service stubs for `grpctest.GrpcTest`.
//!
//! ```text
//! service GrpcTest {
//!   rpc Unary(Request) returns (Response);
//!   rpc ClientStream(stream Request) returns (Response);
//!   rpc ServerStream(Request) returns (stream Response);
//!   rpc BiDirectionalStream(stream Request) returns (stream Response);
//! }
//! ```

#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct Request {
    #[prost(string, tag = "1")]
    pub value: String,
}

#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct Response {
    #[prost(string, tag = "1")]
    pub value: String,
}

include!(concat!(env!("OUT_DIR"), "/grpctest.GrpcTest.rs"));
