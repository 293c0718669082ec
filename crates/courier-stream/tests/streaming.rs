//! Stream adapter behavior against the in-memory transport.

use std::sync::Arc;

use courier_call::{CallError, Client};
use courier_core::{Endpoint, RequestTemplate, TransportError};
use courier_stream::{CallStreamExt, Outcome};
use courier_transport_mem::{MemController, MemTransport, Reply};
use futures_util::StreamExt;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

fn call_with(replies: Vec<Reply>) -> (courier_call::Call<User>, MemController) {
    let (transport, controller) = MemTransport::scripted(replies);
    let client = Client::builder(
        Endpoint::new("http://api.test").unwrap(),
        Arc::new(transport),
    )
    .build();
    let call = client
        .new_call::<User>(&RequestTemplate::get("/users/{id}").path_param("id", "7"))
        .unwrap();
    (call, controller)
}

#[tokio::test]
async fn responses_emits_one_item_then_completes() {
    let (call, _controller) = call_with(vec![Reply::json(200, r#"{"id":7,"name":"ada"}"#)]);
    let mut stream = call.responses();

    let response = stream.next().await.unwrap().unwrap();
    assert!(response.is_success());
    assert_eq!(response.body().unwrap().name, "ada");

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn responses_emits_transport_failure_as_error_item() {
    let (call, _controller) = call_with(vec![Reply::Fail(TransportError::Connect(
        "refused".into(),
    ))]);
    let mut stream = call.responses();

    match stream.next().await.unwrap() {
        Err(CallError::Transport(TransportError::Connect(_))) => {}
        other => panic!("expected connect failure, got {other:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn results_never_fails_the_stream() {
    let (call, _controller) = call_with(vec![Reply::Fail(TransportError::Connect(
        "refused".into(),
    ))]);
    let mut stream = call.results();

    // Exactly one successfully emitted value wrapping the failure.
    let outcome = stream.next().await.unwrap();
    assert!(outcome.is_error());
    assert!(matches!(
        outcome.error(),
        Some(CallError::Transport(TransportError::Connect(_)))
    ));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn results_wraps_responses_of_any_status() {
    let (call, _controller) = call_with(vec![Reply::json(404, r#"{"code":"missing"}"#)]);
    let mut stream = call.results();

    match stream.next().await.unwrap() {
        Outcome::Response(response) => assert_eq!(response.status(), 404),
        Outcome::Error(error) => panic!("expected a response outcome, got {error:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn bodies_unwraps_the_decoded_value() {
    let (call, _controller) = call_with(vec![Reply::json(200, r#"{"id":7,"name":"ada"}"#)]);
    let mut stream = call.bodies();

    let user = stream.next().await.unwrap().unwrap();
    assert_eq!(
        user,
        User {
            id: 7,
            name: "ada".into()
        }
    );
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn bodies_turns_a_failure_status_into_one_error_item() {
    let (call, _controller) = call_with(vec![Reply::json(500, r#"{"code":"boom"}"#)]);
    let mut stream = call.bodies();

    match stream.next().await.unwrap() {
        Err(CallError::Transport(TransportError::Io(io))) => {
            assert!(io.to_string().contains("500"));
        }
        other => panic!("expected i/o-kind error item, got {other:?}"),
    }
    // No value item follows the error.
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn dropping_an_in_flight_stream_cancels_exactly_once() {
    let (call, controller) = call_with(vec![Reply::Hold]);
    let stream = call.responses();
    assert_eq!(controller.pending_count(), 1);

    // Unsubscribe while in flight.
    drop(stream);

    assert_eq!(controller.cancel_count(), 1);
    // The held handler was consumed by the cancel and its Cancelled
    // completion was suppressed; nothing is left to complete.
    assert_eq!(controller.pending_count(), 0);
    assert!(!controller.complete_next(Reply::json(200, r#"{"id":7,"name":"ada"}"#)));
}

#[tokio::test]
async fn dropping_a_finished_stream_does_not_cancel() {
    let (call, controller) = call_with(vec![Reply::json(200, r#"{"id":7,"name":"ada"}"#)]);
    let mut stream = call.responses();
    let _ = stream.next().await.unwrap();
    assert!(stream.next().await.is_none());

    drop(stream);
    assert_eq!(controller.cancel_count(), 0);
}

#[tokio::test]
async fn each_subscription_is_an_independent_execution() {
    let (call, controller) = call_with(vec![
        Reply::json(200, r#"{"id":1,"name":"first"}"#),
        Reply::json(200, r#"{"id":2,"name":"second"}"#),
    ]);

    let mut first = call.responses();
    let mut second = call.responses();

    let a = first.next().await.unwrap().unwrap();
    let b = second.next().await.unwrap().unwrap();
    assert_eq!(a.body().unwrap().name, "first");
    assert_eq!(b.body().unwrap().name, "second");

    // The prototype call itself was never started: both executions came
    // from per-subscription clones.
    assert_eq!(controller.requests().len(), 2);
    assert!(matches!(call.cancel(), Err(CallError::NotStarted)));
}
