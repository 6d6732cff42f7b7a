//! Resilient stream sessions.
//!
//! A [`Session`] drives one open stream: it sends a fresh time-ordered
//! [`Identifier`] on every tick, observes whatever the peer sends back and
//! reports why the stream ended. A [`Driver`] supervises sessions over a
//! [`Transport`], reopening the stream after a fixed delay until
//! credentials are rejected, a message limit is reached, or shutdown is
//! requested.
//!
//! The crate knows nothing about a particular RPC library. Transport
//! adapters implement [`Transport`], [`Outbound`] and [`Inbound`] and
//! report failures as [`StreamError`]s carrying a [`Status`].

mod classify;
mod driver;
mod error;
mod id;
mod message;
mod observer;
mod policy;
mod receiver;
mod session;
mod status;
mod transport;

pub use classify::{Failure, classify};
pub use driver::{Driver, Exit, Report};
pub use error::{EntropyError, Error, Result, StreamError};
pub use id::{Entropy, IdGenerator, Identifier, OsEntropy};
pub use message::{Message, Request, Response};
pub use observer::{Observer, Role, TracingObserver};
pub use policy::{DEFAULT_BOUND, DEFAULT_RECONNECT_DELAY, DEFAULT_SEND_INTERVAL, ReconnectPolicy};
pub use session::{Session, SessionConfig, Shape, State, Summary, Termination};
pub use status::{Code, Status};
pub use transport::{AUTHORIZATION, Absent, AuthContext, AuthProvider, Inbound, Outbound, Transport};
