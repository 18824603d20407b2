//! End-to-end tests of the render pipeline through the public library API.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stubsmith::backends::{BlobStore, FileSystemBlobStore, InMemoryBlobStore};
use stubsmith::delay::{GlobalSettings, InMemorySettingsStore};
use stubsmith::journal::{paginate, parse_journal_request, JournalQuery};
use stubsmith::model::{
    LoggedRequest, Parameters, Response, ResponseBody, ResponseDefinition, ServedEvent,
    StubReference,
};
use stubsmith::render::{
    ProxyResponseRenderer, RenderError, ResponseSynthesizer, StubResponseRenderer,
    MATCHED_STUB_ID_HEADER, MATCHED_STUB_NAME_HEADER,
};
use stubsmith::config::Config;
use stubsmith::delay::ChunkedDribbleDelay;
use stubsmith::scripting::{create_evaluator, RhaiEvaluator, ScriptEvaluator, ScriptExecutor};
use stubsmith::transform::{
    HeaderStampTransformer, ResponseTemplateTransformer, ResponseTransformer, TransformerChain,
    TransformerError,
};
use uuid::Uuid;

/// Proxy delegate answering with a canned body
struct CannedProxy {
    calls: AtomicUsize,
}

#[async_trait]
impl ProxyResponseRenderer for CannedProxy {
    async fn render(&self, event: &ServedEvent) -> Result<Response, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::builder()
            .status(202)
            .body(format!("proxied {}", event.request.url))
            .from_proxy(true)
            .build())
    }
}

/// Counts invocations and tags the response
struct Recorder {
    global: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl ResponseTransformer for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn applies_globally(&self) -> bool {
        self.global
    }

    async fn transform(
        &self,
        _request: &LoggedRequest,
        mut response: Response,
        _files: &dyn BlobStore,
        _parameters: &Parameters,
    ) -> Result<Response, TransformerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        response.headers.set("X-Recorded", "seen");
        Ok(response)
    }
}

struct Pipeline {
    renderer: StubResponseRenderer,
    files: Arc<InMemoryBlobStore>,
    proxy: Arc<CannedProxy>,
    recorder: Arc<Recorder>,
}

fn pipeline(files: InMemoryBlobStore, recorder_global: bool) -> Pipeline {
    pipeline_with(
        files,
        recorder_global,
        GlobalSettings::default(),
        Arc::new(RhaiEvaluator::default()),
    )
}

fn pipeline_with(
    files: InMemoryBlobStore,
    recorder_global: bool,
    global: GlobalSettings,
    evaluator: Arc<dyn ScriptEvaluator>,
) -> Pipeline {
    let files = Arc::new(files);
    let blob_store: Arc<dyn BlobStore> = files.clone();
    let scripts = ScriptExecutor::new(blob_store.clone(), evaluator);
    let settings = Arc::new(InMemorySettingsStore::new(global));
    let proxy = Arc::new(CannedProxy {
        calls: AtomicUsize::new(0),
    });
    let recorder = Arc::new(Recorder {
        global: recorder_global,
        calls: AtomicUsize::new(0),
    });

    let chain = TransformerChain::default()
        .with(Arc::new(ResponseTemplateTransformer::new()))
        .with(Arc::new(HeaderStampTransformer))
        .with(recorder.clone());

    let renderer = StubResponseRenderer::new(
        blob_store.clone(),
        ResponseSynthesizer::new(blob_store, settings, scripts),
        proxy.clone(),
        chain,
    );

    Pipeline {
        renderer,
        files,
        proxy,
        recorder,
    }
}

async fn body_of(response: &Response) -> Bytes {
    response.body.read_all().await.unwrap()
}

#[tokio::test]
async fn test_file_body_for_unmatched_event() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("greeting.txt"), b"Hello from disk\n").unwrap();

    let files: Arc<dyn BlobStore> = Arc::new(FileSystemBlobStore::new(dir.path()));
    let scripts = ScriptExecutor::new(files.clone(), Arc::new(RhaiEvaluator::default()));
    let renderer = StubResponseRenderer::new(
        files.clone(),
        ResponseSynthesizer::new(
            files,
            Arc::new(InMemorySettingsStore::default()),
            scripts,
        ),
        Arc::new(CannedProxy {
            calls: AtomicUsize::new(0),
        }),
        TransformerChain::default(),
    );

    let event = ServedEvent::of(
        LoggedRequest::new("GET", "/greeting"),
        ResponseDefinition::ok().body_file("greeting.txt"),
    );
    let response = renderer.render(&event).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(matches!(response.body, ResponseBody::Stream(_)));
    assert_eq!(body_of(&response).await.as_ref(), b"Hello from disk\n");
    assert!(!response.headers.contains(MATCHED_STUB_ID_HEADER));
    assert!(!response.headers.contains(MATCHED_STUB_NAME_HEADER));
}

#[tokio::test]
async fn test_matched_stub_headers_and_inline_body() {
    let p = pipeline(InMemoryBlobStore::new(), false);
    let stub_id = Uuid::new_v4();
    let event = ServedEvent::matched(
        LoggedRequest::new("GET", "/greet"),
        StubReference::new(stub_id, Some("greet".to_string())),
        ResponseDefinition::ok().text_body("hello"),
    );

    let response = p.renderer.render(&event).await.unwrap();

    assert_eq!(
        response.headers.first_value(MATCHED_STUB_ID_HEADER),
        Some(stub_id.to_string().as_str())
    );
    assert_eq!(response.headers.first_value(MATCHED_STUB_NAME_HEADER), Some("greet"));
    assert_eq!(body_of(&response).await, Bytes::from("hello"));
}

#[tokio::test]
async fn test_not_configured_skips_transformers() {
    let p = pipeline(InMemoryBlobStore::new(), true);
    let event = ServedEvent::unmatched(LoggedRequest::new("GET", "/nowhere"));

    let response = p.renderer.render(&event).await.unwrap();

    assert!(!response.was_configured());
    assert_eq!(response.status, 404);
    assert_eq!(p.recorder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(p.proxy.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_proxied_responses_pass_through_the_chain() {
    let p = pipeline(InMemoryBlobStore::new(), true);
    let event = ServedEvent::of(
        LoggedRequest::new("GET", "/remote?id=1"),
        ResponseDefinition::proxied_to("http://upstream.invalid"),
    );

    let response = p.renderer.render(&event).await.unwrap();

    assert_eq!(p.proxy.calls.load(Ordering::SeqCst), 1);
    assert!(response.from_proxy);
    assert_eq!(response.status, 202);
    assert_eq!(body_of(&response).await, Bytes::from("proxied /remote?id=1"));
    assert_eq!(response.headers.first_value("x-recorded"), Some("seen"));
}

#[tokio::test]
async fn test_proxied_response_takes_definition_timing() {
    let global = GlobalSettings {
        fixed_delay: Some(500),
        delay_distribution: None,
    };
    let p = pipeline_with(
        InMemoryBlobStore::new(),
        false,
        global,
        Arc::new(RhaiEvaluator::default()),
    );

    let own = ServedEvent::of(
        LoggedRequest::new("GET", "/remote"),
        ResponseDefinition::proxied_to("http://upstream.invalid")
            .fixed_delay(200)
            .chunked_dribble(ChunkedDribbleDelay::new(3, 90)),
    );
    let response = p.renderer.render(&own).await.unwrap();
    assert!(response.from_proxy);
    assert_eq!(response.status, 202);
    assert_eq!(response.initial_delay, Duration::from_millis(200));
    let dribble = response.chunked_dribble_delay.unwrap();
    assert_eq!(dribble.number_of_chunks, 3);
    assert_eq!(dribble.total_duration, 90);

    let inherited = ServedEvent::of(
        LoggedRequest::new("GET", "/remote"),
        ResponseDefinition::proxied_to("http://upstream.invalid"),
    );
    let response = p.renderer.render(&inherited).await.unwrap();
    assert_eq!(response.initial_delay, Duration::from_millis(500));
    assert!(response.chunked_dribble_delay.is_none());
}

#[tokio::test]
async fn test_opt_in_transformers_follow_the_definition() {
    let p = pipeline(InMemoryBlobStore::new(), false);
    let definition = ResponseDefinition::ok()
        .text_body("Hello ${parameters.who} at ${request.path}")
        .transformer("response-template")
        .transformer("stamp-headers")
        .transformer_parameter("who", serde_json::json!("Ada"))
        .transformer_parameter("headers", serde_json::json!({ "X-Env": "test" }));
    let event = ServedEvent::of(LoggedRequest::new("GET", "/hello"), definition);

    let response = p.renderer.render(&event).await.unwrap();

    assert_eq!(body_of(&response).await, Bytes::from("Hello Ada at /hello"));
    assert_eq!(response.headers.first_value("x-env"), Some("test"));
    assert_eq!(p.recorder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_script_source_is_read_once() {
    let files = InMemoryBlobStore::new().with_blob(
        "delivery.rhai",
        r#"#{ "id": 124962444, "path": request.path }"#,
    );
    let p = pipeline(files, false);

    for i in 0..5 {
        let event = ServedEvent::of(
            LoggedRequest::new("GET", format!("/deliveries/{i}")),
            ResponseDefinition::ok().script_file("delivery.rhai"),
        );
        let response = p.renderer.render(&event).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body_of(&response).await).unwrap();
        assert_eq!(json["id"], 124962444);
        assert_eq!(json["path"], format!("/deliveries/{i}"));
    }

    assert_eq!(p.files.lookups("delivery.rhai"), 1);
}

#[cfg(feature = "javascript")]
#[tokio::test]
async fn test_javascript_body_with_default_engine() {
    let script = r#"
function estimate() {
    var eta = new Date();
    eta.setMinutes(eta.getMinutes() + 30);
    return {
        "promised_delivery_at": eta.toISOString(),
        "lower_bound_minutes": 5,
        "path": request.path,
        "deliveries": [{ "id": 124962444 }]
    };
}

function render() {
    return JSON.stringify(estimate());
}

render()
"#;
    let scripting = Config::default().scripting;
    let evaluator = create_evaluator(&scripting.engine, scripting.max_operations).unwrap();
    let files = InMemoryBlobStore::new().with_blob("test-script.js", script);
    let p = pipeline_with(files, false, GlobalSettings::default(), evaluator);

    let event = ServedEvent::of(
        LoggedRequest::new("GET", "/deliveries/7"),
        ResponseDefinition::ok().script_file("test-script.js"),
    );
    let response = p.renderer.render(&event).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body_of(&response).await).unwrap();

    assert_eq!(json["lower_bound_minutes"], 5);
    assert_eq!(json["path"], "/deliveries/7");
    assert_eq!(json["deliveries"][0]["id"], 124962444);
    let eta = json["promised_delivery_at"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(eta).unwrap() > Utc::now());
}

#[tokio::test]
async fn test_failing_script_is_a_render_error() {
    let files = InMemoryBlobStore::new().with_blob("broken.rhai", "let = ;");
    let p = pipeline(files, false);
    let event = ServedEvent::of(
        LoggedRequest::new("GET", "/"),
        ResponseDefinition::ok().script_file("broken.rhai"),
    );

    let err = p.renderer.render(&event).await.unwrap_err();
    assert!(matches!(err, RenderError::Script(_)));
}

#[tokio::test]
async fn test_missing_body_file_is_a_render_error() {
    let p = pipeline(InMemoryBlobStore::new(), true);
    let event = ServedEvent::of(
        LoggedRequest::new("GET", "/"),
        ResponseDefinition::ok().body_file("nope.json"),
    );

    let err = p.renderer.render(&event).await.unwrap_err();
    assert!(matches!(err, RenderError::Blob(_)));
    assert_eq!(p.recorder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_journal_since_and_limit() {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let events: Vec<ServedEvent> = (0..5)
        .map(|i| {
            ServedEvent::unmatched(
                LoggedRequest::new("GET", format!("/{i}"))
                    .with_logged_date(base + chrono::Duration::minutes(i)),
            )
        })
        .collect();
    let t3 = events[2].timestamp();

    let params: HashMap<String, String> = [
        ("since".to_string(), t3.to_rfc3339()),
        ("limit".to_string(), "10".to_string()),
    ]
    .into_iter()
    .collect();
    let (_, query) = parse_journal_request(&params).unwrap();
    let page = paginate(events, &query, false);

    let urls: Vec<&str> = page.requests.iter().map(|e| e.request.url.as_str()).collect();
    assert_eq!(urls, vec!["/2", "/3", "/4"]);
    assert!(page.len() <= 3);
}

#[test]
fn test_journal_rejects_unparsable_limit() {
    let params: HashMap<String, String> = [("limit".to_string(), "abc".to_string())]
        .into_iter()
        .collect();
    let err = parse_journal_request(&params).unwrap_err();
    assert!(err.errors.iter().any(|e| e.field == "limit"));

    let empty = paginate(Vec::new(), &JournalQuery::default(), true);
    assert!(empty.is_request_journal_disabled);
}
