//! The receiving task of a session.
//!
//! Runs concurrently with dispatch, pulling messages off the inbound half
//! and handing them over through a single-slot queue. Whatever ends the
//! loop, the queue is closed and the session token is cancelled on the
//! way out so dispatch always learns about it.

use crate::session::Termination;
use crate::transport::Inbound;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) async fn receive_loop<I: Inbound>(
    mut inbound: I,
    queue: mpsc::Sender<I::Message>,
    cancel: CancellationToken,
    limit: Option<u64>,
) -> Termination {
    let mut delivered = 0u64;

    let termination = loop {
        if limit.is_some_and(|limit| delivered >= limit) {
            break Termination::BoundReached;
        }

        let received = tokio::select! {
            _ = cancel.cancelled() => break Termination::Cancelled,
            received = inbound.receive() => received,
        };

        let message = match received {
            Ok(message) => message,
            Err(error) => break Termination::from_stream_error(error),
        };

        tokio::select! {
            _ = cancel.cancelled() => break Termination::Cancelled,
            queued = queue.send(message) => {
                if queued.is_err() {
                    break Termination::Cancelled;
                }
                delivered += 1;
            }
        }
    };

    // close the queue before cancelling so dispatch never waits on it
    drop(queue);
    drop(inbound);
    cancel.cancel();
    termination
}
