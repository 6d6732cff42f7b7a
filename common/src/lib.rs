//! Ambient pieces shared by the grpctest client and server binaries.

pub mod admin;
pub mod config;
pub mod logging;
pub mod signal;
