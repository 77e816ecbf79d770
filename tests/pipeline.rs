//! End-to-end pipeline tests against local stub servers: an HTTP query
//! service for blocks and states, and a websocket event stream.

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use futures::SinkExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use watchdog::dispatch::Dispatcher;
use watchdog::fetch::{Fetcher, HttpFetcher};
use watchdog::listener::listen;
use watchdog::oracle::Transition;
use watchdog::report::Reporter;
use watchdog::types::{Block, Missing, Root, State, Verdict};
use watchdog::Error;

#[derive(Deserialize)]
struct RootQuery {
    root: String,
}

type Objects = Arc<HashMap<String, Value>>;

/// Serve `/beacon/block` and `/beacon/state` from in-memory maps keyed by
/// `0x`-prefixed root, answering 404 for unknown roots.
async fn spawn_query_service(blocks: Objects, states: Objects) -> SocketAddr {
    let app = Router::new()
        .route(
            "/beacon/block",
            get(move |Query(query): Query<RootQuery>| async move {
                match blocks.get(&query.root) {
                    Some(block) => Ok(Json(json!({"beacon_block": block}))),
                    None => Err(StatusCode::NOT_FOUND),
                }
            }),
        )
        .route(
            "/beacon/state",
            get(move |Query(query): Query<RootQuery>| async move {
                match states.get(&query.root) {
                    Some(state) => Ok(Json(json!({"beacon_state": state}))),
                    None => Err(StatusCode::NOT_FOUND),
                }
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Serve one websocket connection, send `messages` in order, then close.
async fn spawn_event_stream(messages: Vec<String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for message in messages {
            ws.send(Message::Text(message)).await.unwrap();
        }
        ws.close(None).await.unwrap();
    });
    addr
}

/// [Transition] that accepts or rejects every block.
#[derive(Clone)]
struct FixedOracle {
    failure: Option<String>,
}

impl Transition for FixedOracle {
    async fn apply(&self, pre_state: &State, _: &Block) -> Result<State, Error> {
        match &self.failure {
            Some(detail) => Err(Error::Transition(detail.clone())),
            None => Ok(pre_state.clone()),
        }
    }
}

#[derive(Clone, Default)]
struct RecordingReporter {
    verdicts: Arc<Mutex<Vec<Verdict>>>,
}

impl Reporter for RecordingReporter {
    fn report(&self, verdict: &Verdict) {
        self.verdicts.lock().unwrap().push(verdict.clone());
    }
}

async fn wait_for_verdicts(reporter: &RecordingReporter, count: usize) -> Vec<Verdict> {
    for _ in 0..200 {
        {
            let verdicts = reporter.verdicts.lock().unwrap();
            if verdicts.len() >= count {
                return verdicts.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} verdicts");
}

fn block_payload(parent_root: Root, state_root: Root) -> Value {
    json!({
        "slot": "11",
        "parent_root": parent_root.to_string(),
        "state_root": state_root.to_string(),
    })
}

/// One resolvable ancestry: the candidate block, its parent (served by the
/// query stub), and the parent's post-state.
fn ancestry() -> (Objects, Objects, Value) {
    let parent_root = Root::new([1u8; 32]);
    let pre_state_root = Root::new([2u8; 32]);

    let parent = block_payload(Root::new([3u8; 32]), pre_state_root);
    let blocks = Arc::new(HashMap::from([(parent_root.to_string(), parent)]));
    let states = Arc::new(HashMap::from([(
        pre_state_root.to_string(),
        json!({"slot": "10"}),
    )]));

    let candidate = block_payload(parent_root, Root::new([4u8; 32]));
    (blocks, states, candidate)
}

fn envelope(event: &str, block: &Value) -> String {
    json!({"event": event, "data": {"block": block}}).to_string()
}

#[tokio::test]
async fn test_confirms_imported_block_end_to_end() {
    let (blocks, states, candidate) = ancestry();
    let query = spawn_query_service(blocks, states).await;
    let stream = spawn_event_stream(vec![
        envelope("beacon_block_imported", &candidate),
        // Unknown kinds and garbage must not disturb the loop.
        json!({"event": "beacon_finalized_checkpoint", "data": {}}).to_string(),
        "garbage".to_string(),
        envelope("beacon_block_imported", &candidate),
    ])
    .await;

    let reporter = RecordingReporter::default();
    let verifier = watchdog::verify::Verifier::new(
        HttpFetcher::new(query.to_string()),
        FixedOracle { failure: None },
        reporter.clone(),
    );
    listen(&format!("ws://{stream}"), Dispatcher::new(verifier))
        .await
        .unwrap();

    let verdicts = wait_for_verdicts(&reporter, 2).await;
    assert_eq!(verdicts, vec![Verdict::Confirmed; 2]);
}

#[tokio::test]
async fn test_flags_false_accept_end_to_end() {
    let (blocks, states, candidate) = ancestry();
    let query = spawn_query_service(blocks, states).await;
    let stream = spawn_event_stream(vec![envelope("beacon_block_imported", &candidate)]).await;

    let reporter = RecordingReporter::default();
    let verifier = watchdog::verify::Verifier::new(
        HttpFetcher::new(query.to_string()),
        FixedOracle {
            failure: Some("invalid state root".into()),
        },
        reporter.clone(),
    );
    listen(&format!("ws://{stream}"), Dispatcher::new(verifier))
        .await
        .unwrap();

    let verdicts = wait_for_verdicts(&reporter, 1).await;
    match &verdicts[0] {
        Verdict::FalseAccept { detail } => assert!(detail.contains("invalid state root")),
        other => panic!("unexpected verdict: {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_block_with_unknown_parent_is_inconclusive() {
    // Empty query service: every fetch answers 404.
    let query = spawn_query_service(Arc::new(HashMap::new()), Arc::new(HashMap::new())).await;
    let candidate = block_payload(Root::new([9u8; 32]), Root::new([4u8; 32]));
    let stream = spawn_event_stream(vec![envelope("beacon_block_rejected", &candidate)]).await;

    let reporter = RecordingReporter::default();
    let verifier = watchdog::verify::Verifier::new(
        HttpFetcher::new(query.to_string()),
        FixedOracle { failure: None },
        reporter.clone(),
    );
    listen(&format!("ws://{stream}"), Dispatcher::new(verifier))
        .await
        .unwrap();

    let verdicts = wait_for_verdicts(&reporter, 1).await;
    assert_eq!(verdicts, vec![Verdict::Inconclusive(Missing::ParentBlock)]);
}

#[tokio::test]
async fn test_initial_connection_failure_is_fatal() {
    // Bind then drop to get an address nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let verifier = watchdog::verify::Verifier::new(
        HttpFetcher::new(addr.to_string()),
        FixedOracle { failure: None },
        RecordingReporter::default(),
    );
    let result = listen(&format!("ws://{addr}"), Dispatcher::new(verifier)).await;
    assert!(matches!(result, Err(Error::Stream(_))));
}

#[tokio::test]
async fn test_http_fetcher_distinguishes_not_found_from_transport() {
    let (blocks, states, _) = ancestry();
    let query = spawn_query_service(blocks, states).await;
    let fetcher = HttpFetcher::new(query.to_string());

    // Known roots resolve.
    let parent = fetcher.block(Root::new([1u8; 32])).await.unwrap();
    assert_eq!(parent.state_root(), Root::new([2u8; 32]));
    fetcher.state(Root::new([2u8; 32])).await.unwrap();

    // Unknown roots are NotFound, not a transport fault.
    let err = fetcher.block(Root::new([9u8; 32])).await.unwrap_err();
    assert!(matches!(err, Error::NotFound));
    let err = fetcher.state(Root::new([9u8; 32])).await.unwrap_err();
    assert!(matches!(err, Error::NotFound));

    // An unreachable service is a transport fault.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let unreachable = HttpFetcher::new(addr.to_string());
    let err = unreachable.block(Root::new([1u8; 32])).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
