//! Behaviour tests for stream sessions.
//!
//! Most tests drive a session through [`ScriptedTransport`] on a paused tokio
//! clock, so backoff sleeps complete instantly and their lengths can be read
//! off `Instant::now()`. The tests at the bottom go through a real HTTP
//! server.

use crate::client::{BodyStream, ClientConfig, GitterClient, StreamTransport};
use crate::error::{GitterError, Result};
use crate::{CloseReason, Event, Events, StreamSession};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_ok;

/// What a scripted connect attempt does.
enum Reply {
    /// Fail with the given status
    Status(u16),
    /// Succeed; the body yields these chunks then ends
    Body(Vec<&'static [u8]>),
    /// Succeed; the body yields these chunks then stays open
    Open(Vec<&'static [u8]>),
    /// Never complete the connect
    Hang,
}

/// Transport that plays back a fixed list of replies, then fails with 503.
struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(ScriptedTransport {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Instant> {
        self.calls.lock().clone()
    }
}

fn chunks(parts: Vec<&'static [u8]>) -> impl futures::Stream<Item = Result<Bytes>> + Send {
    stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
}

#[async_trait]
impl StreamTransport for ScriptedTransport {
    async fn open(&self, _url: &str) -> Result<BodyStream> {
        self.calls.lock().push(Instant::now());
        let reply = self.replies.lock().pop_front().unwrap_or(Reply::Status(503));
        match reply {
            Reply::Status(code) => Err(GitterError::Status(code)),
            Reply::Body(parts) => Ok(Box::pin(chunks(parts))),
            Reply::Open(parts) => Ok(Box::pin(chunks(parts).chain(stream::pending()))),
            Reply::Hang => std::future::pending().await,
        }
    }
}

fn session(
    transport: Arc<ScriptedTransport>,
    wait_ms: u64,
    max_retries: u32,
) -> (StreamSession, Events) {
    StreamSession::new(
        "https://stream.gitter.im/v1/rooms/xyz/chatMessages",
        transport,
        Duration::from_millis(wait_ms),
        max_retries,
    )
}

async fn collect(mut events: Events) -> Vec<Event> {
    let mut out = Vec::new();
    while let Some(event) = events.next().await {
        out.push(event);
    }
    out
}

fn message_ids(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::MessageReceived(message) => Some(message.id.clone()),
            Event::ConnectionClosed(_) => None,
        })
        .collect()
}

fn closed_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::ConnectionClosed(_)))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_two_lines_then_clean_close() {
    let transport = ScriptedTransport::new(vec![Reply::Body(vec![
        b"{\"id\":\"1\"}\n",
        b"{\"id\":\"2\"}\n",
    ])]);
    let (session, events) = session(transport.clone(), 3000, 5);

    tokio::spawn(session.listen());
    let events = collect(events).await;

    assert_eq!(events.len(), 3);
    assert_eq!(message_ids(&events), vec!["1", "2"]);
    assert_eq!(
        events.last(),
        Some(&Event::ConnectionClosed(CloseReason::RetriesExhausted))
    );
    // first connect plus five failed reconnects
    assert_eq!(transport.calls().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_endpoint_closes_after_max_retries() {
    let transport = ScriptedTransport::new(vec![]);
    let (session, events) = session(transport.clone(), 3000, 5);

    let listener = tokio::spawn(session.listen());
    let events = collect(events).await;
    assert_ok!(listener.await);

    assert_eq!(
        events,
        vec![Event::ConnectionClosed(CloseReason::RetriesExhausted)]
    );
    assert_eq!(transport.calls().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_linearly() {
    let transport = ScriptedTransport::new(vec![]);
    let (session, events) = session(transport.clone(), 100, 4);

    let started = Instant::now();
    tokio::spawn(session.listen());
    let events = collect(events).await;
    let elapsed = started.elapsed();

    assert_eq!(closed_count(&events), 1);

    let calls = transport.calls();
    assert_eq!(calls.len(), 4);
    for (pair, expected) in calls.windows(2).zip([100u128, 200, 300]) {
        let gap = (pair[1] - pair[0]).as_millis();
        assert!(gap >= expected && gap < expected + 5, "gap {}ms", gap);
    }

    // 100 + 200 + 300 + 400 before giving up
    assert!(elapsed.as_millis() >= 1000 && elapsed.as_millis() < 1020);
}

#[tokio::test(start_paused = true)]
async fn test_successful_connect_resets_retry_count() {
    let transport = ScriptedTransport::new(vec![
        Reply::Status(500),
        Reply::Status(502),
        Reply::Body(vec![b"{\"id\":\"a\"}\n"]),
        Reply::Status(503),
        Reply::Body(vec![b"{\"id\":\"b\"}\n"]),
    ]);
    let (session, events) = session(transport.clone(), 10, 3);

    tokio::spawn(session.listen());
    let events = collect(events).await;

    // two failures then a connect, one failure then a connect, three failures
    assert_eq!(message_ids(&events), vec!["a", "b"]);
    assert_eq!(closed_count(&events), 1);
    assert_eq!(transport.calls().len(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_line_is_skipped() {
    let transport = ScriptedTransport::new(vec![Reply::Body(vec![
        b"{\"id\":\"1\"}\n{this is not json}\n",
        b"{\"id\":\"2\"}\n",
    ])]);
    let (session, events) = session(transport.clone(), 1, 1);

    tokio::spawn(session.listen());
    let events = collect(events).await;

    assert_eq!(message_ids(&events), vec!["1", "2"]);
    assert_eq!(events.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeats_produce_no_events() {
    let transport = ScriptedTransport::new(vec![Reply::Body(vec![
        b" \n",
        b"{\"id\":\"1\",\"text\":\"hi\"}\n",
        b" \n \n",
    ])]);
    let (session, events) = session(transport, 1, 1);

    tokio::spawn(session.listen());
    let events = collect(events).await;

    assert_eq!(message_ids(&events), vec!["1"]);
    assert_eq!(events.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_lines_split_across_reconnect_are_not_merged() {
    let transport = ScriptedTransport::new(vec![
        Reply::Body(vec![b"{\"id\":\"1\"}\n{\"id\":"]),
        Reply::Body(vec![b"{\"id\":\"2\"}\n"]),
    ]);
    let (session, events) = session(transport, 1, 1);

    tokio::spawn(session.listen());
    let events = collect(events).await;

    assert_eq!(message_ids(&events), vec!["1", "2"]);
}

#[tokio::test(start_paused = true)]
async fn test_close_before_listen() {
    let transport = ScriptedTransport::new(vec![Reply::Open(vec![b"{\"id\":\"1\"}\n"])]);
    let (session, events) = session(transport.clone(), 100, 5);

    let closer = session.closer();
    closer.close();
    closer.close();
    assert!(closer.is_closed());

    tokio::spawn(session.listen());
    let events = collect(events).await;

    assert_eq!(events, vec![Event::ConnectionClosed(CloseReason::Requested)]);
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_close_while_connecting() {
    let transport = ScriptedTransport::new(vec![Reply::Hang]);
    let (session, events) = session(transport.clone(), 100, 5);
    let closer = session.closer();

    let listener = tokio::spawn(session.listen());
    while transport.calls().is_empty() {
        tokio::task::yield_now().await;
    }

    closer.close();
    closer.close();

    let events = collect(events).await;
    assert_ok!(listener.await);
    assert_eq!(events, vec![Event::ConnectionClosed(CloseReason::Requested)]);
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_during_backoff() {
    let transport = ScriptedTransport::new(vec![Reply::Status(503)]);
    let (session, events) = session(transport.clone(), 60_000, 5);
    let closer = session.closer();

    tokio::spawn(session.listen());
    while transport.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    closer.close();

    let events = collect(events).await;
    assert_eq!(events, vec![Event::ConnectionClosed(CloseReason::Requested)]);
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_while_reading() {
    let transport = ScriptedTransport::new(vec![Reply::Open(vec![b"{\"id\":\"1\"}\n"])]);
    let (session, mut events) = session(transport.clone(), 100, 5);
    let closer = session.closer();

    let listener = tokio::spawn(session.listen());

    match events.next().await {
        Some(Event::MessageReceived(message)) => assert_eq!(message.id, "1"),
        other => panic!("expected a message, got {:?}", other),
    }

    closer.close();
    assert_eq!(
        events.next().await,
        Some(Event::ConnectionClosed(CloseReason::Requested))
    );
    assert_eq!(events.next().await, None);
    assert_ok!(listener.await);
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_after_terminal_keeps_reason() {
    let transport = ScriptedTransport::new(vec![]);
    let (session, events) = session(transport, 1, 2);
    let closer = session.closer();

    tokio::spawn(session.listen());
    let events = collect(events).await;
    closer.close();

    assert_eq!(
        events,
        vec![Event::ConnectionClosed(CloseReason::RetriesExhausted)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropped_receiver_stops_listening() {
    let transport = ScriptedTransport::new(vec![Reply::Open(vec![
        b"{\"id\":\"1\"}\n",
        b"{\"id\":\"2\"}\n",
        b"{\"id\":\"3\"}\n",
    ])]);
    let (session, mut events) = session(transport, 100, 5);
    let closer = session.closer();

    let listener = tokio::spawn(session.listen());
    assert!(matches!(
        events.next().await,
        Some(Event::MessageReceived(_))
    ));
    drop(events);

    assert_ok!(listener.await);
    assert!(closer.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_receiver_stops_idle_stream() {
    let transport = ScriptedTransport::new(vec![Reply::Open(vec![b" \n"])]);
    let (session, events) = session(transport.clone(), 100, 5);
    let closer = session.closer();

    let listener = tokio::spawn(session.listen());
    while transport.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    drop(events);

    let finished = tokio::time::timeout(Duration::from_secs(3600), listener).await;
    assert!(finished.is_ok(), "listen kept running after the receiver was dropped");
    assert!(closer.is_closed());
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_receiver_stops_reconnecting() {
    let transport = ScriptedTransport::new(vec![]);
    let (session, events) = session(transport.clone(), 60_000, 50);
    let closer = session.closer();

    let listener = tokio::spawn(session.listen());
    while transport.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    drop(events);

    let finished = tokio::time::timeout(Duration::from_secs(1), listener).await;
    assert!(finished.is_ok(), "listen kept retrying after the receiver was dropped");
    assert!(closer.is_closed());
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_max_retries_never_connects() {
    let transport = ScriptedTransport::new(vec![Reply::Body(vec![b"{\"id\":\"1\"}\n"])]);
    let (session, events) = session(transport.clone(), 100, 5);
    let session = session.with_max_retries(0);

    tokio::spawn(session.listen());
    let events = collect(events).await;

    assert_eq!(
        events,
        vec![Event::ConnectionClosed(CloseReason::RetriesExhausted)]
    );
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_events_as_stream() {
    let transport = ScriptedTransport::new(vec![Reply::Body(vec![
        b"{\"id\":\"1\"}\n{\"id\":\"2\"}\n",
    ])]);
    let (session, events) = session(transport, 1, 1);

    tokio::spawn(session.listen());
    let ids: Vec<String> = events
        .into_stream()
        .filter_map(|event| async move {
            match event {
                Event::MessageReceived(message) => Some(message.id),
                Event::ConnectionClosed(_) => None,
            }
        })
        .collect()
        .await;

    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_http_endpoint_always_503() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rooms/xyz/chatMessages")
        .match_header("authorization", "Bearer abc")
        .with_status(503)
        .expect(5)
        .create_async()
        .await;

    let config = ClientConfig::default()
        .with_stream_base_url(server.url())
        .with_stream_wait(Duration::from_millis(1));
    let client = GitterClient::with_config("abc", config);
    let (session, events) = client.stream("xyz").unwrap();

    tokio::spawn(session.listen());
    let events = collect(events).await;

    assert_eq!(
        events,
        vec![Event::ConnectionClosed(CloseReason::RetriesExhausted)]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_stream_delivers_messages() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/rooms/xyz/chatMessages")
        .match_header("authorization", "Bearer abc")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_body("{\"id\":\"1\",\"text\":\"first\"}\n \n{\"id\":\"2\",\"text\":\"second\"}\n")
        .create_async()
        .await;

    let config = ClientConfig::default()
        .with_stream_base_url(server.url())
        .with_stream_wait(Duration::from_millis(1));
    let client = GitterClient::with_config("abc", config);
    let (session, mut events) = client.stream("xyz").unwrap();
    let closer = session.closer();

    let listener = tokio::spawn(session.listen());

    let mut texts = Vec::new();
    while texts.len() < 2 {
        match events.next().await {
            Some(Event::MessageReceived(message)) => texts.push(message.text),
            other => panic!("expected a message, got {:?}", other),
        }
    }
    assert_eq!(texts, vec!["first", "second"]);

    // the mock keeps serving the same body on reconnect; drain until closed
    closer.close();
    let rest = collect(events).await;
    assert_eq!(closed_count(&rest), 1);
    assert_eq!(
        rest.last(),
        Some(&Event::ConnectionClosed(CloseReason::Requested))
    );
    assert_ok!(listener.await);
}
