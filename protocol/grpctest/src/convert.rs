//! Conversions between wire messages, tonic statuses and session types.

use crate::proto;
use grpctest_session::{Code, Request, Response, Status, StreamError};

impl From<proto::Request> for Request {
    fn from(request: proto::Request) -> Self {
        Request::new(request.value)
    }
}

impl From<Request> for proto::Request {
    fn from(request: Request) -> Self {
        proto::Request {
            value: request.into_value(),
        }
    }
}

impl From<proto::Response> for Response {
    fn from(response: proto::Response) -> Self {
        Response::new(response.value)
    }
}

impl From<Response> for proto::Response {
    fn from(response: Response) -> Self {
        proto::Response {
            value: response.into_value(),
        }
    }
}

pub fn status_from_tonic(status: &tonic::Status) -> Status {
    let code = Code::from_u32(status.code() as i32 as u32);
    Status::new(code, status.message())
}

pub fn status_to_tonic(status: &Status) -> tonic::Status {
    let code = tonic::Code::from_i32(status.code().as_u32() as i32);
    tonic::Status::new(code, status.message().unwrap_or_default())
}

pub fn stream_error(status: &tonic::Status) -> StreamError {
    StreamError::Status(status_from_tonic(status))
}
