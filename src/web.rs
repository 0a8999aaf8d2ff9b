use crate::config::ReaderConfig;
use crate::error::{LoadFailure, StoreError};
use crate::lexicon::{LexiconIndex, Lookup};
use crate::playback::{MAX_SPEED, MIN_SPEED, Speed, WordTiming, estimate_timings};
use crate::store::{FileStore, SelectionStore, load_selection, save_selection};
use crate::verse::{Verse, VerseRef};
use crate::reader::ReaderState;
use askama::Template;
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 1000;

pub struct AppState {
    pub verses: Vec<Verse>,
    pub total_verses: usize,
    pub failure: Option<LoadFailure>,
    pub store: Arc<dyn SelectionStore>,
    pub base_url: String,
}

impl AppState {
    pub fn new(
        reader: &ReaderState,
        store: Arc<dyn SelectionStore>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            verses: reader.verses().to_vec(),
            total_verses: reader.total_verses(),
            failure: reader.failure().cloned(),
            store,
            base_url: base_url.into(),
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub base_url: String,
    pub reader: ReaderConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_url: "http://127.0.0.1:8080".to_string(),
            reader: ReaderConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Store(StoreError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<StoreError> for WebError {
    fn from(value: StoreError) -> Self {
        WebError::Store(value)
    }
}

/// Loads the corpus and serves until ctrl-c or SIGTERM. A failed corpus load
/// does not stop the server; the reading page shows the failure instead.
pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let (reader, result) = config.reader.load_state();
    if let Err(err) = &result {
        warn!(error = %err, guidance = err.guidance(), "serving without verses");
    }
    let store = FileStore::open(&config.reader.store_path)?;
    let state = Arc::new(AppState::new(&reader, Arc::new(store), config.base_url.clone()));
    let router = build_router(state);
    info!(
        %config.addr,
        base = %config.base_url,
        verses = reader.verses().len(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/verses", get(api_verses))
        .route("/api/verse", get(api_verse))
        .route("/api/lexicon", get(api_lexicon))
        .route("/api/timings", get(api_timings))
        .route("/api/selection", get(api_selection).put(api_select))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let status = if state.failure.is_some() { "degraded" } else { "ok" };
    Json(json!({
        "status": status,
        "service": "tanakh-reader",
        "verses": state.verses.len(),
    }))
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    let selected = load_selection(state.store.as_ref());
    let initial_index = selected
        .as_ref()
        .and_then(|verse| verse.reference().find(&state.verses))
        .map(|(index, _)| index as i64)
        .unwrap_or(-1);
    let options = state
        .verses
        .iter()
        .enumerate()
        .map(|(index, verse)| VerseOption {
            index,
            label: verse.reference().to_string(),
        })
        .collect();
    let template = ReaderTemplate {
        options,
        failure: state.failure.as_ref(),
        hidden: state.total_verses.saturating_sub(state.verses.len()),
        initial_index,
        min_speed: MIN_SPEED,
        max_speed: MAX_SPEED,
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| format!("<!DOCTYPE html><p>Template error: {err}</p>")),
    )
}

async fn api_verses(
    State(state): State<SharedState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<VersePagePayload>, ApiError> {
    let Query(params) = params?;
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let book = params
        .book
        .as_deref()
        .map(str::trim)
        .filter(|book| !book.is_empty());
    let matching: Vec<IndexedVerse> = state
        .verses
        .iter()
        .enumerate()
        .filter(|(_, verse)| book.is_none_or(|name| verse.book == name))
        .map(|(index, verse)| IndexedVerse {
            index,
            verse: verse.clone(),
        })
        .collect();
    let total = matching.len();
    let verses = matching.into_iter().skip(offset).take(limit).collect();
    Ok(Json(VersePagePayload {
        total,
        offset,
        limit,
        verses,
    }))
}

async fn api_verse(
    State(state): State<SharedState>,
    params: Result<Query<VerseParams>, QueryRejection>,
) -> Result<Json<VersePayload>, ApiError> {
    let Query(params) = params?;
    let reference = verse_reference(params.book.as_deref(), params.chapter, params.verse)?;
    let (index, verse) = find(&state, &reference)?;
    Ok(Json(VersePayload::new(index, verse, &state.base_url)))
}

async fn api_lexicon(
    params: Result<Query<LexiconParams>, QueryRejection>,
) -> Result<Json<Lookup>, ApiError> {
    let Query(params) = params?;
    let word = params
        .word
        .as_deref()
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter `word` is required"))?;
    let lookup = LexiconIndex::lookup_token(word);
    if !lookup.found() {
        return Err(ApiError::not_found(format!("No lexicon entry for {word:?}")));
    }
    Ok(Json(lookup))
}

async fn api_timings(
    State(state): State<SharedState>,
    params: Result<Query<TimingParams>, QueryRejection>,
) -> Result<Json<TimingsPayload>, ApiError> {
    let Query(params) = params?;
    let speed = Speed::new(params.speed.unwrap_or(1.0))
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let reference = verse_reference(params.book.as_deref(), params.chapter, params.verse)?;
    let (_, verse) = find(&state, &reference)?;
    Ok(Json(TimingsPayload {
        reference: reference.to_string(),
        speed: speed.get(),
        slow: speed.is_slow(),
        timings: estimate_timings(&verse.text, speed),
    }))
}

async fn api_selection(State(state): State<SharedState>) -> Json<SelectionPayload> {
    Json(SelectionPayload {
        selection: load_selection(state.store.as_ref()),
    })
}

async fn api_select(
    State(state): State<SharedState>,
    body: Result<Json<VerseRef>, JsonRejection>,
) -> Result<Json<SelectionPayload>, ApiError> {
    let Json(reference) = body?;
    let (_, verse) = find(&state, &reference)?;
    save_selection(state.store.as_ref(), verse)
        .map_err(|err| ApiError::internal(format!("Failed to save selection: {err}")))?;
    Ok(Json(SelectionPayload {
        selection: Some(verse.clone()),
    }))
}

fn verse_link(base_url: &str, verse: &Verse) -> String {
    format!(
        "{}/api/verse?book={}&chapter={}&verse={}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(&verse.book, NON_ALPHANUMERIC),
        verse.chapter,
        verse.verse
    )
}

fn find<'s>(state: &'s AppState, reference: &VerseRef) -> Result<(usize, &'s Verse), ApiError> {
    reference
        .find(&state.verses)
        .ok_or_else(|| ApiError::not_found(format!("No verse {reference}")))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    offset: Option<usize>,
    limit: Option<usize>,
    book: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerseParams {
    book: Option<String>,
    chapter: Option<u32>,
    verse: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TimingParams {
    book: Option<String>,
    chapter: Option<u32>,
    verse: Option<u32>,
    speed: Option<f32>,
}

fn verse_reference(
    book: Option<&str>,
    chapter: Option<u32>,
    verse: Option<u32>,
) -> Result<VerseRef, ApiError> {
    match (book.map(str::trim), chapter, verse) {
        (Some(book), Some(chapter), Some(verse)) if !book.is_empty() => {
            Ok(VerseRef::new(book, chapter, verse))
        }
        _ => Err(ApiError::bad_request(
            "Query parameters `book`, `chapter` and `verse` are required",
        )),
    }
}

#[derive(Debug, Deserialize)]
struct LexiconParams {
    word: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedVerse {
    index: usize,
    #[serde(flatten)]
    verse: Verse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersePagePayload {
    total: usize,
    offset: usize,
    limit: usize,
    verses: Vec<IndexedVerse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersePayload {
    index: usize,
    reference: String,
    link: String,
    verse: Verse,
    words: Vec<String>,
}

impl VersePayload {
    fn new(index: usize, verse: &Verse, base_url: &str) -> Self {
        Self {
            index,
            reference: verse.reference().to_string(),
            link: verse_link(base_url, verse),
            verse: verse.clone(),
            words: verse.words().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimingsPayload {
    reference: String,
    speed: f32,
    slow: bool,
    timings: Vec<WordTiming>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SelectionPayload {
    selection: Option<Verse>,
}

struct VerseOption {
    index: usize,
    label: String,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="he">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Tanakh Reader • Interactive Reading Companion</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="container mx-auto p-4" dir="rtl">
      <h1 class="text-2xl font-bold mb-4 sm:text-3xl">Tanakh Reader - Interactive Reading Companion</h1>
      {% if let Some(failure) = failure %}
      <div id="load-failure" class="mb-4 rounded border border-red-300 bg-red-50 p-4" role="alert">
        <p class="font-semibold">Failed to load the corpus: {{ failure.message }}</p>
        <p>{{ failure.guidance }}</p>
      </div>
      {% endif %}
      <select id="verse-select" class="mb-4 p-2 border w-full sm:w-auto" aria-label="Select Verse" role="combobox">
        <option value="">Select Verse</option>
        {% for option in options %}
        <option value="{{ option.index }}">{{ option.label }}</option>
        {% endfor %}
      </select>
      {% if hidden > 0 %}
      <p class="text-sm text-slate-500 mb-4">{{ hidden }} further verses are not listed.</p>
      {% endif %}
      <p id="verse-text" class="text-lg mb-4 sm:text-xl md:text-2xl"></p>
      <div class="flex flex-col sm:flex-row gap-4 mb-4">
        <button id="play" class="bg-blue-500 text-white p-2 rounded" aria-pressed="false" aria-label="Play">Play</button>
        <label class="flex items-center">
          Speed: <input id="speed" type="range" min="{{ min_speed }}" max="{{ max_speed }}" step="0.1" value="1.0" class="mx-2 w-full sm:w-32" aria-label="Speed" />
          <span id="speed-value">1.0</span>
        </label>
      </div>
      <div id="popup" class="fixed inset-0 bg-gray-800/50 hidden items-center justify-center" role="dialog" aria-modal="true">
        <div class="bg-white p-4 rounded max-w-md" dir="ltr">
          <h2 class="text-xl font-bold">Word Analysis</h2>
          <p id="popup-word" dir="rtl"></p>
          <p>IPA: <span id="popup-ipa"></span></p>
          <p>Morph: <span id="popup-morph"></span></p>
          <button id="popup-close" class="bg-red-500 text-white p-2 mt-2" aria-label="Close">Close</button>
        </div>
      </div>
      <p class="text-xs text-slate-400 mt-8" dir="ltr">tanakh-reader v{{ version }}</p>
    </main>
    <script>
      const initialIndex = {{ initial_index }};
      const select = document.getElementById('verse-select');
      const verseText = document.getElementById('verse-text');
      const playButton = document.getElementById('play');
      const speedInput = document.getElementById('speed');
      const speedValue = document.getElementById('speed-value');
      const popup = document.getElementById('popup');
      let current = null;
      let timings = [];
      let playing = false;
      let startedAt = 0;
      let frame = 0;

      function renderVerse(payload) {
        current = payload.verse;
        verseText.replaceChildren();
        payload.words.forEach(function (word, index) {
          const span = document.createElement('span');
          span.textContent = word + ' ';
          span.dataset.index = index;
          span.className = 'cursor-pointer';
          span.setAttribute('role', 'button');
          span.setAttribute('tabindex', '0');
          span.setAttribute('aria-label', 'Word: ' + word + ', click for lexicon');
          span.addEventListener('click', function () { openLexicon(word); });
          verseText.appendChild(span);
        });
      }

      function highlight(index) {
        verseText.querySelectorAll('span').forEach(function (span) {
          span.classList.toggle('bg-yellow-300', Number(span.dataset.index) === index);
        });
      }

      async function selectVerse(index, persist) {
        stop();
        const response = await fetch('/api/verses?limit=1&offset=' + index);
        const page = await response.json();
        if (page.verses.length === 0) return;
        const verse = page.verses[0];
        const detail = await fetch('/api/verse?book=' + encodeURIComponent(verse.book) +
          '&chapter=' + verse.chapter + '&verse=' + verse.verse);
        renderVerse(await detail.json());
        if (persist) {
          await fetch('/api/selection', {
            method: 'PUT',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ book: verse.book, chapter: verse.chapter, verse: verse.verse }),
          });
        }
      }

      async function openLexicon(word) {
        const response = await fetch('/api/lexicon?word=' + encodeURIComponent(word));
        const body = await response.json();
        document.getElementById('popup-word').textContent = word;
        document.getElementById('popup-ipa').textContent = body.entry ? body.entry.ipa : '-';
        document.getElementById('popup-morph').textContent =
          body.entry ? (body.entry.morph || '-') : (body.error || '-');
        popup.classList.remove('hidden');
        popup.classList.add('flex');
      }

      function tick() {
        if (!playing) return;
        const elapsed = (performance.now() - startedAt) / 1000;
        const index = timings.findIndex(function (t) { return t.start <= elapsed && elapsed < t.end; });
        if (index < 0) { stop(); return; }
        highlight(index);
        frame = requestAnimationFrame(tick);
      }

      async function play() {
        if (!current) return;
        const response = await fetch('/api/timings?book=' + encodeURIComponent(current.book) +
          '&chapter=' + current.chapter + '&verse=' + current.verse + '&speed=' + speedInput.value);
        timings = (await response.json()).timings || [];
        playing = true;
        startedAt = performance.now();
        playButton.textContent = 'Pause';
        playButton.setAttribute('aria-pressed', 'true');
        tick();
      }

      function stop() {
        playing = false;
        cancelAnimationFrame(frame);
        highlight(-1);
        playButton.textContent = 'Play';
        playButton.setAttribute('aria-pressed', 'false');
      }

      select.addEventListener('change', function () {
        if (select.value !== '') selectVerse(Number(select.value), true);
      });
      playButton.addEventListener('click', function () { playing ? stop() : play(); });
      speedInput.addEventListener('input', function () { speedValue.textContent = Number(speedInput.value).toFixed(1); });
      document.getElementById('popup-close').addEventListener('click', function () {
        popup.classList.add('hidden');
        popup.classList.remove('flex');
      });
      if (initialIndex >= 0) {
        select.value = String(initialIndex);
        selectVerse(initialIndex, false);
      }
    </script>
  </body>
</html>"#,
    ext = "html"
)]
struct ReaderTemplate<'a> {
    options: Vec<VerseOption>,
    failure: Option<&'a LoadFailure>,
    hidden: usize,
    initial_index: i64,
    min_speed: f32,
    max_speed: f32,
    version: &'static str,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let document = json!({
            "Genesis": [[
                ["בְּרֵאשִׁית", "בָּרָא", "אֱלֹהִים"],
                ["וַיֹּאמֶר", "אֱלֹהִים", "יְהִי", "אוֹר׃"],
            ]],
            "1 Samuel": [[["וַיְהִי", "אִישׁ"]]],
        });
        let mut reader = ReaderState::new();
        reader.load(Some(&document), 2).unwrap();
        Arc::new(AppState::new(
            &reader,
            Arc::new(MemoryStore::new()),
            "http://127.0.0.1:8080",
        ))
    }

    fn test_router() -> Router {
        build_router(test_state())
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn verses_are_paged_within_the_display_bound() {
        let (status, body) = get_json(test_router(), "/api/verses?offset=1&limit=5").await;
        assert!(status.is_success());
        let page: VersePagePayload = serde_json::from_value(body).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.verses.len(), 1);
        assert_eq!(page.verses[0].index, 1);
        assert_eq!(page.verses[0].verse.verse, 2);
    }

    #[tokio::test]
    async fn verse_lookup_splits_words() {
        let (status, body) =
            get_json(test_router(), "/api/verse?book=Genesis&chapter=1&verse=2").await;
        assert!(status.is_success());
        let payload: VersePayload = serde_json::from_value(body).unwrap();
        assert_eq!(payload.reference, "Genesis 1:2");
        assert_eq!(payload.words.len(), 4);
        assert_eq!(
            payload.link,
            "http://127.0.0.1:8080/api/verse?book=Genesis&chapter=1&verse=2"
        );
    }

    #[tokio::test]
    async fn verse_past_the_bound_is_not_found() {
        let (status, body) =
            get_json(test_router(), "/api/verse?book=1%20Samuel&chapter=1&verse=1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("1 Samuel 1:1"));

        let (status, _) = get_json(test_router(), "/api/verse?book=Genesis").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lexicon_lookup_cleans_tokens() {
        let uri = format!(
            "/api/lexicon?word={}",
            utf8_percent_encode("אוֹר׃", NON_ALPHANUMERIC)
        );
        let (status, body) = get_json(test_router(), &uri).await;
        assert!(status.is_success());
        assert_eq!(body["entry"]["ipa"], "ʔoʁ");

        let (status, _) = get_json(test_router(), "/api/lexicon?word=zzz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn timings_validate_speed() {
        let (status, body) = get_json(
            test_router(),
            "/api/timings?book=Genesis&chapter=1&verse=1&speed=2.0",
        )
        .await;
        assert!(status.is_success());
        let payload: TimingsPayload = serde_json::from_value(body).unwrap();
        assert_eq!(payload.timings.len(), 3);
        assert_eq!(payload.timings[2].end, 0.75);

        let (status, _) = get_json(
            test_router(),
            "/api/timings?book=Genesis&chapter=1&verse=1&speed=5",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_queries_are_reported_as_json() {
        let (status, body) =
            get_json(test_router(), "/api/verse?book=Genesis&chapter=x&verse=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = get_json(test_router(), "/api/verses?offset=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = get_json(
            test_router(),
            "/api/timings?book=Genesis&chapter=1&verse=1&speed=fast",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_selection_body_is_reported_as_json() {
        let request = Request::put("/api/selection")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"book":"Genesis","chapter":"one"}"#))
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(payload["error"].is_string());
    }

    #[tokio::test]
    async fn selection_is_saved_and_shown_on_the_page() {
        let state = test_state();
        let request = Request::put("/api/selection")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"book":"Genesis","chapter":1,"verse":2}"#))
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        assert!(response.status().is_success());

        let (_, selection) = get_json(build_router(state.clone()), "/api/selection").await;
        assert_eq!(selection["selection"]["verse"], 2);

        let response = build_router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("const initialIndex = 1;"));
        assert!(html.contains("Genesis 1:2"));
        assert!(html.contains("further verses are not listed"));
    }

    #[tokio::test]
    async fn failed_load_is_reported_on_the_page() {
        let mut reader = ReaderState::new();
        reader.load(Some(&json!({ "Genesis": 1 })), 10).unwrap_err();
        let state = Arc::new(AppState::new(&reader, Arc::new(MemoryStore::new()), ""));

        let (_, health) = get_json(build_router(state.clone()), "/healthz").await;
        assert_eq!(health["status"], "degraded");

        let response = build_router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("id=\"load-failure\""));
        assert!(html.contains("no verse could be extracted"));
    }
}
