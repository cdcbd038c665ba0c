use super::*;
use crate::error::LOOKUP_FAILED_MESSAGE;
use axum::{
    extract::{Path, State},
    http::StatusCode as AxumStatus,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct EndpointState {
    hits: Arc<Mutex<Vec<String>>>,
}

async fn handle_lookup(State(state): State<EndpointState>, Path(erf): Path<String>) -> Response {
    state.hits.lock().expect("hits lock").push(erf.clone());
    match erf.as_str() {
        "1234" => Json(LookupEnvelope::found(AddressRecord {
            street_number: Some("12".into()),
            street_name: Some("Oak Ave".into()),
            ..AddressRecord::default()
        }))
        .into_response(),
        "999" => (
            AxumStatus::NOT_FOUND,
            Json(LookupEnvelope::failure("ERF not found")),
        )
            .into_response(),
        "403" => (
            AxumStatus::FORBIDDEN,
            Json(LookupEnvelope::failure("forbidden")),
        )
            .into_response(),
        "777" => Json(LookupEnvelope::failure("no mapping")).into_response(),
        "888" => (AxumStatus::OK, "<html>not json</html>").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(LookupEnvelope::default()).into_response()
        }
        _ => (
            AxumStatus::INTERNAL_SERVER_ERROR,
            Json(LookupEnvelope::failure("database unavailable")),
        )
            .into_response(),
    }
}

async fn spawn_lookup_server() -> anyhow::Result<(LookupSettings, EndpointState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = EndpointState::default();
    let app = Router::new()
        .route("/api/erf/lookup/:erf", get(handle_lookup))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let settings = LookupSettings {
        base_url: format!("http://{addr}"),
        ..LookupSettings::default()
    };
    Ok((settings, state))
}

fn erf(raw: &str) -> ErfNumber {
    ErfNumber::eligible(raw, 1).expect("eligible erf")
}

#[tokio::test]
async fn http_source_decodes_found_record() {
    let (settings, endpoint) = spawn_lookup_server().await.expect("spawn server");
    let source = HttpAddressSource::new(&settings).expect("source");

    let record = source
        .fetch(&erf("1234"))
        .await
        .expect("fetch")
        .expect("record");

    assert_eq!(record.street_number.as_deref(), Some("12"));
    assert_eq!(record.street_name.as_deref(), Some("Oak Ave"));
    assert_eq!(record.postal_code, None);
    assert_eq!(*endpoint.hits.lock().expect("hits lock"), vec!["1234"]);
}

#[tokio::test]
async fn http_source_maps_404_to_negative_result() {
    let (settings, _endpoint) = spawn_lookup_server().await.expect("spawn server");
    let source = HttpAddressSource::new(&settings).expect("source");

    let outcome = source.fetch(&erf("999")).await.expect("404 is not an error");
    assert!(outcome.is_none());
}

#[tokio::test]
async fn http_source_treats_unsuccessful_body_as_negative_result() {
    let (settings, _endpoint) = spawn_lookup_server().await.expect("spawn server");
    let source = HttpAddressSource::new(&settings).expect("source");

    let outcome = source.fetch(&erf("777")).await.expect("fetch");
    assert!(outcome.is_none());
}

#[tokio::test]
async fn http_source_reports_other_statuses() {
    let (settings, _endpoint) = spawn_lookup_server().await.expect("spawn server");
    let source = HttpAddressSource::new(&settings).expect("source");

    let err = source.fetch(&erf("555")).await.expect_err("500 must fail");
    assert!(matches!(err, LookupError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
    assert_eq!(err.user_message(), LOOKUP_FAILED_MESSAGE);

    let err = source.fetch(&erf("403")).await.expect_err("403 must fail");
    assert!(matches!(err, LookupError::Status(StatusCode::FORBIDDEN)));
}

#[tokio::test]
async fn http_source_reports_undecodable_body() {
    let (settings, _endpoint) = spawn_lookup_server().await.expect("spawn server");
    let source = HttpAddressSource::new(&settings).expect("source");

    let err = source.fetch(&erf("888")).await.expect_err("html must fail");
    assert!(matches!(err, LookupError::Decode(_)), "unexpected error: {err:?}");
    assert_eq!(err.user_message(), LOOKUP_FAILED_MESSAGE);
}

#[tokio::test]
async fn http_source_reports_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let settings = LookupSettings {
        base_url: format!("http://{addr}"),
        ..LookupSettings::default()
    };
    let source = HttpAddressSource::new(&settings).expect("source");

    let err = source.fetch(&erf("1234")).await.expect_err("nothing listening");
    assert!(matches!(err, LookupError::Transport(_)), "unexpected error: {err:?}");
    assert!(!err.user_message().is_empty());
    assert_ne!(err.user_message(), LOOKUP_FAILED_MESSAGE);
}

#[tokio::test]
async fn http_source_times_out_as_transport_failure() {
    let (mut settings, _endpoint) = spawn_lookup_server().await.expect("spawn server");
    settings.request_timeout_ms = 100;
    let source = HttpAddressSource::new(&settings).expect("source");

    let err = source.fetch(&erf("slow")).await.expect_err("must time out");
    assert_eq!(err.user_message(), "Address lookup timed out");
}

#[test]
fn url_for_encodes_identifier_as_single_segment() {
    let settings = LookupSettings {
        base_url: "http://lookup.internal:8080/".into(),
        lookup_path: "api/erf/lookup/".into(),
        ..LookupSettings::default()
    };
    let source = HttpAddressSource::new(&settings).expect("source");

    let url = source.url_for(&erf("12/3 A"));
    assert_eq!(
        url.as_str(),
        "http://lookup.internal:8080/api/erf/lookup/12%2F3%20A"
    );
}

#[test]
fn url_for_handles_empty_lookup_path() {
    let settings = LookupSettings {
        base_url: "http://lookup.internal".into(),
        lookup_path: String::new(),
        ..LookupSettings::default()
    };
    let source = HttpAddressSource::new(&settings).expect("source");

    assert_eq!(
        source.url_for(&erf("4411")).as_str(),
        "http://lookup.internal/4411"
    );
}

#[tokio::test]
async fn lookup_client_end_to_end_scenarios() {
    let (settings, endpoint) = spawn_lookup_server().await.expect("spawn server");
    let client = LookupClient::new(Arc::new(HttpAddressSource::new(&settings).expect("source")));

    let record = client.lookup(&erf("1234")).await.expect("found");
    assert_eq!(record.street_name.as_deref(), Some("Oak Ave"));
    assert_eq!(
        client.state(),
        LookupState {
            loading: false,
            error: None,
            generation: 1,
        }
    );

    assert!(client.lookup(&erf("999")).await.is_none());
    let state = client.state();
    assert!(!state.loading);
    assert_eq!(state.error, None);

    assert!(client.lookup(&erf("555")).await.is_none());
    let state = client.state();
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Failed to lookup address"));
    assert_eq!(state.generation, 3);

    assert_eq!(
        *endpoint.hits.lock().expect("hits lock"),
        vec!["1234", "999", "555"]
    );
}

#[tokio::test]
async fn bump_generation_resets_error_and_sets_loading() {
    let (settings, _endpoint) = spawn_lookup_server().await.expect("spawn server");
    let client = LookupClient::new(Arc::new(HttpAddressSource::new(&settings).expect("source")));
    client.lookup(&erf("555")).await;
    assert!(client.state().error.is_some());

    let generation = client.bump_generation();
    let state = client.state();
    assert_eq!(generation, 2);
    assert!(state.loading);
    assert_eq!(state.error, None);
}
