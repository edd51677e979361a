//!
//! coffer HTTP/HTTPS server
//! ------------------------
//! Axum front end over the bank. All state lives in the bank, the MIME table
//! and the config; requests themselves are stateless.
//!
//! Responsibilities:
//! - Startup: load the program bank, config record, MIME record, certificate
//!   records (secure mode) and the data bank before accepting connections.
//! - Route dispatch: bank reads under `db/`, wildcard queries, passcode-gated
//!   writes and deletes, static-file passthrough, the index fallback, `quit`.
//! - Periodic autosave of the data bank and the final save on shutdown.
//! - The three-status wire contract: 200, 404 (missing/I-O), 401 (everything
//!   else that fails), plain text everywhere except successful reads.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{Path as RecordPath, Query, Request, State};
use axum::http::{header::CONTENT_TYPE, Method, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::bank::{paths, Bank, RecordKind, SharedBank};
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::mime::MimeTable;

/// Extensions served straight from the filesystem on GET.
static STATIC_ASSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+\.(html|css|js|png|jpg|ico|ttf|wav|mp3)$").unwrap());

/// Extensions accepted for direct filesystem writes on POST.
static UPLOAD_ASSET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+\.(png|jpg|wav|mp3)$").unwrap());

const MAX_FORM_BYTES: usize = 64 * 1024 * 1024;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The data bank every `db/`, `query-files` and `delete` route operates on.
    pub bank: SharedBank,
    pub mime: Arc<MimeTable>,
    pub passcode: String,
    /// Default file served when no route matches.
    pub index: String,
    /// Filesystem root for static passthrough.
    pub root: PathBuf,
    autosave: Option<AbortHandle>,
    shutdown: axum_server::Handle,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::UNAUTHORIZED);
        end_response(status, self.message().to_string())
    }
}

/// Plain-text terminal response, the only response shape besides successful
/// reads.
fn end_response(status: StatusCode, message: String) -> Response {
    (status, [(CONTENT_TYPE, "text/plain")], message).into_response()
}

/// Starts the server rooted at `root`. The program bank `bank_name` supplies
/// `Config/<config_name>.txt`, `Config/Mime.txt` and, in secure mode, the
/// certificate records; the config's `db` property names the data bank.
pub async fn run_with_root(root: &Path, config_name: &str, bank_name: &str) -> anyhow::Result<()> {
    let program_bank = Bank::load(root, bank_name)
        .with_context(|| format!("While loading program bank {bank_name}"))?;
    let config = ServerConfig::load(&program_bank, config_name)
        .with_context(|| format!("While reading config record {config_name}"))?;
    let mime = MimeTable::load(&program_bank, "Mime")
        .context("While reading the Mime config record")?;

    let db_name = config.db()?.to_string();
    let bank_path = Bank::file_path(root, &db_name);
    let bank = if bank_path.exists() {
        Bank::load(root, &db_name).with_context(|| format!("While loading bank {db_name}"))?
    } else {
        // An absent data bank file means an empty store; anything else is fatal.
        info!("Bank file {} not found, starting empty.", bank_path.display());
        Bank::empty(root, &db_name)
    };
    info!("Loaded bank '{}' with {} records.", db_name, bank.len());
    let bank = SharedBank::new(bank);

    let minutes = config.autosave_minutes()?;
    let shutdown = axum_server::Handle::new();

    // Periodic snapshot of the data bank. Failures are logged and retried on
    // the next tick; the in-memory map stays authoritative meanwhile.
    let autosave = if minutes > 0 {
        let bank_for_save = bank.clone();
        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(minutes * 60));
            tick.tick().await; // the first tick completes immediately
            loop {
                tick.tick().await;
                save_bank(&bank_for_save).await;
            }
        });
        Some(task.abort_handle())
    } else {
        warn!("Autosave disabled (timeout=0).");
        None
    };

    let state = AppState {
        bank,
        mime: Arc::new(mime),
        passcode: config.passcode()?.to_string(),
        index: config.index()?.to_string(),
        root: root.to_path_buf(),
        autosave,
        shutdown: shutdown.clone(),
    };

    let mut app = Router::new()
        .route("/db/{*name}", get(read_record).post(write_record).fallback(unsupported_method))
        .route("/query-files", get(query_files).fallback(unsupported_method))
        .route("/quit", get(quit).fallback(unsupported_method))
        .fallback(fall_through)
        .with_state(state);

    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], config.port()?));
    if config.secure() {
        // Don't let the connection count get too high.
        let ceiling = config.max_connections()? as usize;
        app = app.layer(from_fn_with_state(Arc::new(Semaphore::new(ceiling)), limit_connections));

        let certificate = config.certificate()?;
        let key = program_bank.get(&format!("Certificates/{certificate}.key"))?.content();
        let cert = program_bank.get(&format!("Certificates/{certificate}.crt"))?.content();
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem(cert.into_bytes(), key.into_bytes())
            .await
            .context("While building the TLS configuration")?;
        info!("Starting HTTPS server on {addr}");
        axum_server::bind_rustls(addr, tls)
            .handle(shutdown)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!("Starting server on {addr}");
        axum_server::bind(addr)
            .handle(shutdown)
            .serve(app.into_make_service())
            .await?;
    }
    Ok(())
}

/// Renders the bank under its lock, then writes the snapshot without holding
/// it. Never fails the caller; the result is logged either way.
async fn save_bank(bank: &SharedBank) {
    let (path, data) = {
        let guard = bank.0.lock();
        (guard.backing_path().to_path_buf(), guard.render())
    };
    if let Some(dir) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!("Bank save failed: {e}");
            return;
        }
    }
    match tokio::fs::write(&path, data).await {
        Ok(()) => info!("Saved code bank."),
        Err(e) => error!("Bank save failed: {e}"),
    }
}

/// Holds requests beyond the configured ceiling until a slot frees up.
async fn limit_connections(
    State(ceiling): State<Arc<Semaphore>>,
    request: Request,
    next: Next,
) -> Response {
    let _permit = ceiling.acquire().await.ok();
    next.run(request).await
}

/// GET `db/<name>`: serve a text record from the bank with its resolved
/// content type. Binary records never stream through this path.
async fn read_record(State(state): State<AppState>, RecordPath(name): RecordPath<String>) -> Response {
    match fetch_record(&state, &name) {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            error!("GET db/{name} -> {e}");
            e.into_response()
        }
    }
}

fn fetch_record(state: &AppState, name: &str) -> AppResult<(String, String)> {
    let guard = state.bank.0.lock();
    let record = guard.get(name)?;
    let mime = state.mime.resolve(&paths::file_extension(name))?;
    if mime.binary {
        return Err(AppError::unsupported("Cannot access binary files from code bank."));
    }
    Ok((mime.content_type.clone(), record.content()))
}

/// POST `db/<name>`: passcode-gated write of a `code` record.
async fn write_record(
    State(state): State<AppState>,
    RecordPath(name): RecordPath<String>,
    body: String,
) -> Response {
    match store_record(&state, &name, &body) {
        Ok(message) => end_response(StatusCode::OK, message),
        Err(e) => {
            error!("POST db/{name} -> {e}");
            e.into_response()
        }
    }
}

fn store_record(state: &AppState, name: &str, body: &str) -> AppResult<String> {
    let params = parse_form(body);
    let data = params.get("data").ok_or_else(|| AppError::format("No data parameter passed."))?;
    check_passcode(state, params.get("passcode"), "database write")?;
    state.bank.0.lock().put(name, RecordKind::Code, data);
    Ok(format!("Wrote {name} to code bank."))
}

fn check_passcode(state: &AppState, provided: Option<&String>, action: &str) -> AppResult<()> {
    if provided.map(String::as_str) == Some(state.passcode.as_str()) {
        Ok(())
    } else {
        Err(AppError::auth(format!("Invalid passcode for {action}.")))
    }
}

#[derive(Debug, Deserialize)]
struct QueryFilesParams {
    folder: Option<String>,
    search: Option<String>,
}

/// GET `query-files`: wildcard query over a folder, keys denormalized to URL
/// paths. Always 200; no matches is an empty body.
async fn query_files(
    State(state): State<AppState>,
    Query(params): Query<QueryFilesParams>,
) -> Response {
    let Some(folder) = params.folder else {
        return AppError::format("Missing folder parameter.").into_response();
    };
    let Some(search) = params.search else {
        return AppError::format("Missing search parameter.").into_response();
    };
    let files: Vec<String> = state
        .bank
        .0
        .lock()
        .query_files(&folder, &search)
        .into_iter()
        .map(|key| paths::to_url_path(&key))
        .collect();
    end_response(StatusCode::OK, files.join("\n"))
}

/// GET `quit`: stop the autosave timer, force one final save, then stop
/// accepting connections.
async fn quit(State(state): State<AppState>) -> Response {
    if let Some(autosave) = &state.autosave {
        autosave.abort();
    }
    save_bank(&state.bank).await;
    info!("Server stopping.");
    state.shutdown.graceful_shutdown(Some(Duration::from_secs(1)));
    end_response(StatusCode::OK, "Saved code bank. Server stopping.".to_string())
}

/// Wrong method on a fixed route; keeps the wire contract's status set.
async fn unsupported_method(request: Request) -> Response {
    if request.method() == Method::POST {
        AppError::auth("Can only write to code bank.").into_response()
    } else {
        AppError::auth("Unsupported method.").into_response()
    }
}

/// Everything without a fixed route: the `delete<name>` prefix form, static
/// assets, the index default, binary uploads, and the write fallback.
async fn fall_through(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().trim_start_matches('/').to_string();
    let method = request.method().clone();
    if method == Method::GET {
        if let Some(name) = path.strip_prefix("delete") {
            let params = parse_form(request.uri().query().unwrap_or(""));
            return match remove_record(&state, name, &params) {
                Ok(message) => end_response(StatusCode::OK, message),
                Err(e) => {
                    error!("GET {path} -> {e}");
                    e.into_response()
                }
            };
        }
        if STATIC_ASSET.is_match(&path) {
            return read_file(&state, &path).await;
        }
        let index = state.index.clone();
        read_file(&state, &index).await
    } else if method == Method::POST {
        let bytes = match axum::body::to_bytes(request.into_body(), MAX_FORM_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => return AppError::io(e.to_string()).into_response(),
        };
        let body = String::from_utf8_lossy(&bytes).to_string();
        let params = parse_form(&body);
        if UPLOAD_ASSET.is_match(&path) {
            return write_file(&state, &path, &params).await;
        }
        AppError::auth("Can only write to code bank.").into_response()
    } else {
        AppError::auth("Unsupported method.").into_response()
    }
}

fn remove_record(state: &AppState, name: &str, params: &HashMap<String, String>) -> AppResult<String> {
    check_passcode(state, params.get("passcode"), "delete")?;
    state.bank.0.lock().delete(name)?;
    Ok(format!("Deleted {name}."))
}

/// Serves a file straight from the filesystem under the server root, using
/// the MIME binary flag to pick byte versus text reads.
async fn read_file(state: &AppState, file: &str) -> Response {
    match read_file_inner(state, file).await {
        Ok(response) => response,
        Err(e) => {
            error!("GET {file} -> {e}");
            e.into_response()
        }
    }
}

async fn read_file_inner(state: &AppState, file: &str) -> AppResult<Response> {
    let mime = state.mime.resolve(&paths::file_extension(file))?.clone();
    let path = local_path(&state.root, file);
    if mime.binary {
        let bytes = tokio::fs::read(&path).await?;
        Ok((StatusCode::OK, [(CONTENT_TYPE, mime.content_type)], bytes).into_response())
    } else {
        let text = tokio::fs::read_to_string(&path).await?;
        Ok((StatusCode::OK, [(CONTENT_TYPE, mime.content_type)], text).into_response())
    }
}

/// Writes an uploaded asset straight to the filesystem. Any failure on this
/// path, a bad passcode included, answers 404 with the underlying message.
async fn write_file(state: &AppState, file: &str, params: &HashMap<String, String>) -> Response {
    match write_file_inner(state, file, params).await {
        Ok(message) => end_response(StatusCode::OK, message),
        Err(e) => {
            error!("POST {file} -> {e}");
            end_response(StatusCode::NOT_FOUND, format!("Write Error: {e}"))
        }
    }
}

async fn write_file_inner(
    state: &AppState,
    file: &str,
    params: &HashMap<String, String>,
) -> AppResult<String> {
    let data = params.get("data").ok_or_else(|| AppError::format("No data parameter passed."))?;
    check_passcode(state, params.get("passcode"), "write")?;
    let mime = state.mime.resolve(&paths::file_extension(file))?;
    let path = local_path(&state.root, file);
    if mime.binary {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| AppError::io(e.to_string()))?;
        tokio::fs::write(&path, bytes).await?;
    } else {
        tokio::fs::write(&path, data).await?;
    }
    Ok(format!("Wrote {file}."))
}

/// Resolves a request path under the server root. Empty, `.` and `..`
/// components are dropped so passthrough stays confined to the root.
fn local_path(root: &Path, file: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in file.split(['/', '\\']) {
        if part.is_empty() || part == "." || part == ".." {
            continue;
        }
        out.push(part);
    }
    out
}

/// Decodes a URL-encoded query string or form body into a key/value map.
fn parse_form(data: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in data.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key), decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_parsing_decodes_pairs() {
        let params = parse_form("data=Buy%20milk%0ACall+Bob&passcode=hunter2");
        assert_eq!(params["data"], "Buy milk\nCall Bob");
        assert_eq!(params["passcode"], "hunter2");
    }

    #[test]
    fn form_parsing_tolerates_odd_shapes() {
        let params = parse_form("lonely&empty=&a=b");
        assert_eq!(params["lonely"], "");
        assert_eq!(params["empty"], "");
        assert_eq!(params["a"], "b");
        assert!(parse_form("").is_empty());
    }

    #[test]
    fn local_path_confines_to_the_root() {
        let root = Path::new("/srv/site");
        assert_eq!(local_path(root, "Images/A.png"), root.join("Images").join("A.png"));
        assert_eq!(local_path(root, "../../etc/passwd.png"), root.join("etc").join("passwd.png"));
        assert_eq!(local_path(root, "a/./b.css"), root.join("a").join("b.css"));
    }

    #[test]
    fn static_route_patterns_anchor_on_known_extensions() {
        assert!(STATIC_ASSET.is_match("Index.html"));
        assert!(STATIC_ASSET.is_match("Styles/Page.css"));
        assert!(!STATIC_ASSET.is_match("Notes.txt"));
        assert!(!STATIC_ASSET.is_match(".html"));
        assert!(UPLOAD_ASSET.is_match("Upload/Photo.jpg"));
        assert!(!UPLOAD_ASSET.is_match("Page.html"));
    }
}
