//! Session behavior against scripted stream halves.
//!
//! All tests run with a paused clock, so tick timing is exact.

mod support;

use grpctest_session::{
    Code, Request, Response, Session, State, Status, StreamError, Termination,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use support::*;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

const PERIOD: Duration = Duration::from_millis(100);

fn outbound(log: &Log) -> RecordingOutbound<Request, Response> {
    RecordingOutbound::new(log.clone())
}

#[tokio::test(start_paused = true)]
async fn test_duplex_observes_in_order_then_ends_clean() {
    let log = Log::default();
    let observer = Arc::new(RecordingObserver::default());
    let mut events = responses(&["r1", "r2"]);
    events.push(Err(StreamError::EndOfStream));

    let summary = Session::duplex(outbound(&log), ScriptedInbound::new(events), PERIOD)
        .with_observer(observer.clone())
        .run()
        .await;

    assert_eq!(summary.termination, Termination::CleanEnd);
    assert_eq!(summary.received, 2);
    assert_eq!(observer.received_values(), vec!["r1", "r2"]);
    // the sending half is closed exactly once while draining
    assert_eq!(log.finish_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_state_transitions() {
    let observer = Arc::new(RecordingObserver::default());
    let session = Session::duplex(
        outbound(&Log::default()),
        ScriptedInbound::<Response>::new(vec![Err(StreamError::EndOfStream)]),
        PERIOD,
    )
    .with_observer(observer.clone());
    assert_eq!(session.state(), State::Connecting);

    session.run().await;

    assert_eq!(
        observer.transitions(),
        vec![
            (State::Connecting, State::Active),
            (State::Active, State::Draining),
            (State::Draining, State::Closed),
        ]
    );
    assert_eq!(observer.terminations(), vec![Termination::CleanEnd]);
}

#[tokio::test(start_paused = true)]
async fn test_sends_one_identifier_per_tick() {
    let log = Log::default();
    let cancel = CancellationToken::new();
    let started = Instant::now();
    let session = Session::duplex(outbound(&log), ScriptedInbound::<Response>::quiet(), PERIOD)
        .with_cancellation(cancel.clone());
    let task = tokio::spawn(session.run());

    time::sleep(PERIOD * 10 + PERIOD / 2).await;
    cancel.cancel();
    let summary = task.await.unwrap();

    assert_eq!(summary.termination, Termination::Cancelled);
    assert_eq!(summary.sent, 10);

    let times = log.sent_times();
    assert_eq!(times.len(), 10);
    assert!(times[0] - started >= PERIOD);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= PERIOD);
    }

    let values = log.sent_values();
    assert!(values.iter().all(|v| v.len() == 26));
    let unique: HashSet<_> = values.iter().collect();
    assert_eq!(unique.len(), values.len());
}

#[tokio::test(start_paused = true)]
async fn test_sends_and_receives_interleave() {
    let log = Log::default();
    let cancel = CancellationToken::new();
    let inbound = ScriptedInbound::new(responses(&["a", "b", "c", "d", "e"]))
        .spaced(Duration::from_millis(150));
    let observer = Arc::new(RecordingObserver::default());
    let session = Session::duplex(outbound(&log), inbound, PERIOD)
        .with_observer(observer.clone())
        .with_cancellation(cancel.clone());
    let task = tokio::spawn(session.run());

    time::sleep(Duration::from_millis(1050)).await;
    cancel.cancel();
    let summary = task.await.unwrap();

    assert_eq!(summary.sent, 10);
    assert_eq!(summary.received, 5);
    assert_eq!(observer.received_values(), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test(start_paused = true)]
async fn test_many_responses_arrive_in_order() {
    let values: Vec<String> = (0..50).map(|i| format!("r{i:02}")).collect();
    let mut events: Vec<_> = values.iter().map(|v| Ok(Response::new(v.clone()))).collect();
    events.push(Err(StreamError::EndOfStream));
    let observer = Arc::new(RecordingObserver::default());

    let summary = Session::receive_only(ScriptedInbound::new(events), None)
        .with_observer(observer.clone())
        .run()
        .await;

    assert_eq!(summary.termination, Termination::CleanEnd);
    assert_eq!(observer.received_values(), values);
}

#[tokio::test(start_paused = true)]
async fn test_queued_messages_are_observed_before_failure() {
    let mut events = responses(&["r1", "r2", "r3"]);
    events.push(Err(unavailable()));
    let observer = Arc::new(RecordingObserver::default());

    let summary = Session::receive_only(ScriptedInbound::new(events), None)
        .with_observer(observer.clone())
        .run()
        .await;

    assert_eq!(summary.termination, Termination::Transient(unavailable()));
    assert_eq!(summary.received, 3);
    assert_eq!(observer.received_values(), vec!["r1", "r2", "r3"]);
}

#[tokio::test(start_paused = true)]
async fn test_receive_bound_never_asks_for_more() {
    let inbound = ScriptedInbound::new(responses(&["r1", "r2", "r3", "r4", "r5"]));
    let polls = inbound.polls();

    let summary = Session::receive_only(inbound, Some(3)).run().await;

    assert_eq!(summary.termination, Termination::BoundReached);
    assert_eq!(summary.received, 3);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_send_bound_sends_exactly_n_then_closes() {
    for bound in 1..=5u64 {
        let log = Log::default();
        let observer = Arc::new(RecordingObserver::default());
        let outbound = outbound(&log).finishing(Ok(Some(Response::new("done"))));

        let summary = Session::send_only(outbound, PERIOD, Some(bound))
            .with_observer(observer.clone())
            .run()
            .await;

        assert_eq!(summary.termination, Termination::BoundReached);
        assert_eq!(summary.sent, bound);
        let events = log.events();
        assert_eq!(events.len() as u64, bound + 1);
        assert_eq!(events.last(), Some(&Sent::Finished));
        assert_eq!(log.finish_count(), 1);
        assert_eq!(observer.count(&Event::Acknowledged("done".into())), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_send_bound_end_of_stream_on_close_is_success() {
    let log = Log::default();
    let outbound = outbound(&log).finishing(Err(StreamError::EndOfStream));

    let summary = Session::send_only(outbound, PERIOD, Some(2)).run().await;

    assert_eq!(summary.termination, Termination::BoundReached);
}

#[tokio::test(start_paused = true)]
async fn test_send_bound_close_failure_is_fatal() {
    let log = Log::default();
    let error = StreamError::from(Status::internal("stream reset"));
    let outbound = outbound(&log).finishing(Err(error.clone()));

    let summary = Session::send_only(outbound, PERIOD, Some(3)).run().await;

    assert_eq!(summary.termination, Termination::Fatal(error));
    assert_eq!(summary.sent, 3);
}

#[tokio::test(start_paused = true)]
async fn test_send_bound_close_rejected_is_unauthorized() {
    let log = Log::default();
    let error = StreamError::from(Status::unauthenticated("Invalid API key"));
    let outbound = outbound(&log).finishing(Err(error.clone()));

    let summary = Session::send_only(outbound, PERIOD, Some(2)).run().await;

    assert_eq!(summary.termination, Termination::Unauthorized(error));
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_drains_and_half_closes() {
    let log = Log::default();
    let outbound = outbound(&log).failing_after(2, unavailable());

    let summary = Session::duplex(outbound, ScriptedInbound::<Response>::quiet(), PERIOD)
        .run()
        .await;

    assert_eq!(summary.termination, Termination::Transient(unavailable()));
    assert_eq!(summary.sent, 2);
    assert_eq!(log.finish_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_entropy_failure_ends_session_without_sending() {
    let log = Log::default();
    let observer = Arc::new(RecordingObserver::default());

    let summary = Session::duplex(outbound(&log), ScriptedInbound::<Response>::quiet(), PERIOD)
        .with_entropy(Box::new(FailingEntropy))
        .with_observer(observer.clone())
        .run()
        .await;

    assert!(matches!(summary.termination, Termination::Entropy(_)));
    assert_eq!(summary.sent, 0);
    assert!(log.sent_values().is_empty());
    assert_eq!(observer.count(&Event::EntropyFailed), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_receive() {
    let error = status(Code::Unauthenticated);
    let summary = Session::duplex(
        outbound(&Log::default()),
        ScriptedInbound::<Response>::new(vec![Err(error.clone())]),
        PERIOD,
    )
    .run()
    .await;

    assert_eq!(summary.termination, Termination::Unauthorized(error));
}

#[tokio::test(start_paused = true)]
async fn test_remote_cancel_is_cancelled() {
    let summary = Session::receive_only(
        ScriptedInbound::<Response>::new(vec![Err(status(Code::Cancelled))]),
        None,
    )
    .run()
    .await;

    assert_eq!(summary.termination, Termination::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_external_cancel_stops_quiet_receiver() {
    let cancel = CancellationToken::new();
    let session = Session::receive_only(ScriptedInbound::<Response>::quiet(), None)
        .with_cancellation(cancel.clone());
    let task = tokio::spawn(session.run());

    time::sleep(Duration::from_secs(5)).await;
    cancel.cancel();
    let summary = task.await.unwrap();

    assert_eq!(summary.termination, Termination::Cancelled);
    assert_eq!(summary.received, 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_cancels_its_token_on_termination() {
    let cancel = CancellationToken::new();
    let summary = Session::receive_only(
        ScriptedInbound::<Response>::new(vec![Err(StreamError::EndOfStream)]),
        None,
    )
    .with_cancellation(cancel.clone())
    .run()
    .await;

    assert_eq!(summary.termination, Termination::CleanEnd);
    assert!(cancel.is_cancelled());
}
