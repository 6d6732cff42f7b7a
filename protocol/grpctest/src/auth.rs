//! Bearer credentials in request metadata.
//!
//! Clients send `authorization: bearer <key>`. The scheme is matched
//! case-insensitively.

use grpctest_session::{AUTHORIZATION, AuthContext};
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};

pub const SCHEME: &str = "bearer";

pub fn auth_context(key: &str) -> AuthContext {
    AuthContext::authorization(SCHEME, key)
}

/// Wrap `message` in a request carrying every entry of `auth` as metadata.
pub fn authorized<T>(message: T, auth: &AuthContext) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    for (key, value) in auth.iter() {
        match (
            MetadataKey::<Ascii>::from_bytes(key.as_bytes()),
            MetadataValue::<Ascii>::try_from(value),
        ) {
            (Ok(key), Ok(value)) => {
                request.metadata_mut().insert(key, value);
            }
            _ => tracing::warn!(key, "dropping metadata entry that is not valid ascii"),
        }
    }
    request
}

/// Extract the bearer token from request metadata.
pub fn bearer_token(metadata: &MetadataMap) -> Result<&str, tonic::Status> {
    let value = metadata
        .get(AUTHORIZATION)
        .ok_or_else(|| tonic::Status::unauthenticated("Request unauthenticated with bearer"))?;
    let value = value
        .to_str()
        .map_err(|_| tonic::Status::unauthenticated("Bad authorization string"))?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| tonic::Status::unauthenticated("Bad authorization string"))?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return Err(tonic::Status::unauthenticated(
            "Request unauthenticated with bearer",
        ));
    }
    Ok(token)
}
