use crate::error::AppError;
use crate::state::SharedState;
use axum::body::Body;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tmplshelf_core::{
    lookup, search, FileRecord, Generation, LookupRequest, MatchMode, PageRequest,
    SearchParams, TemplateError,
};
use tokio_util::io::ReaderStream;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Attributes a `/templates` item can carry, in response order.
const ITEM_FIELDS: [&str; 8] = [
    "id",
    "name",
    "relativePath",
    "size",
    "mtimeMs",
    "category",
    "downloadUrl",
    "rawUrl",
];

// GET /health
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub templates: usize,
    pub root: String,
    pub generation: Generation,
    pub indexed_at: String,
}

pub async fn health(State(state): State<SharedState>) -> Result<Json<HealthResponse>, AppError> {
    let index = state.ensure_index().await.map_err(AppError::index_build)?;
    Ok(Json(HealthResponse {
        status: "ok",
        templates: index.len(),
        root: index.root().display().to_string(),
        generation: index.generation(),
        indexed_at: index.indexed_at().to_string(),
    }))
}

// POST /refresh
#[derive(Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    pub total: usize,
    pub generation: Generation,
}

pub async fn refresh(State(state): State<SharedState>) -> Result<Json<RefreshResponse>, AppError> {
    let index = state.rebuild().await.map_err(AppError::refresh)?;
    tracing::info!(
        total = index.len(),
        generation = %index.generation(),
        "index refreshed"
    );
    Ok(Json(RefreshResponse {
        status: "refreshed",
        total: index.len(),
        generation: index.generation(),
    }))
}

// GET /templates
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub q_mode: Option<String>,
    pub dir: Option<String>,
    pub limit: Option<String>,
    pub per_page: Option<String>,
    pub offset: Option<String>,
    pub page: Option<String>,
    pub fields: Option<String>,
    pub abs: Option<String>,
    pub view: Option<String>,
}

impl ListParams {
    fn search_params(&self) -> SearchParams {
        SearchParams {
            query: self.q.clone(),
            dir: self.dir.clone(),
            mode: self
                .q_mode
                .as_deref()
                .map(MatchMode::parse)
                .unwrap_or_default(),
            page: PageRequest::new(
                parse_int(&self.limit).or_else(|| parse_int(&self.per_page)),
                parse_int(&self.offset),
                parse_int(&self.page),
            ),
        }
    }

    fn wants_absolute_urls(&self) -> bool {
        self.abs.as_deref().is_some_and(is_truthy)
    }

    fn wants_bare_items(&self) -> bool {
        self.view
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("items"))
    }
}

pub async fn list_templates(
    State(state): State<SharedState>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let index = state.ensure_index().await.map_err(AppError::index_build)?;
    let search_params = params.search_params();
    let query_config = state.config().query.clone();

    let result = tokio::task::spawn_blocking(move || search(&index, &search_params, &query_config))
        .await
        .map_err(AppError::list)?;

    let fields = selected_fields(params.fields.as_deref());
    let origin = if params.wants_absolute_urls() {
        request_origin(&headers)
    } else {
        None
    };
    let items: Vec<Value> = result
        .items
        .iter()
        .map(|record| project(record, &fields, origin.as_deref()))
        .collect();

    if params.wants_bare_items() {
        return Ok(Json(Value::Array(items)));
    }

    let mut body = Map::new();
    body.insert("total".into(), result.total.into());
    body.insert("count".into(), result.count.into());
    body.insert("limit".into(), result.limit.into());
    body.insert("offset".into(), result.offset.into());
    if !result.tokens.is_empty() {
        body.insert("tokens".into(), result.tokens.into());
    }
    if let Some(token) = result.simplified_to {
        body.insert("simplifiedTo".into(), token.into());
    }
    body.insert("items".into(), Value::Array(items));
    Ok(Json(Value::Object(body)))
}

// GET /raw
pub async fn raw(
    State(state): State<SharedState>,
    req: Result<Query<LookupRequest>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(req) = req?;
    let record = resolve_record(&state, &req).await?;
    send_file(&record, false).await
}

// GET /download
pub async fn download(
    State(state): State<SharedState>,
    req: Result<Query<LookupRequest>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(req) = req?;
    let record = resolve_record(&state, &req).await?;
    send_file(&record, true).await
}

// GET /template/{id}
pub async fn template_by_id(
    State(state): State<SharedState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let record = resolve_record(&state, &LookupRequest::by_id(id)).await?;
    send_file(&record, false).await
}

pub async fn not_found() -> AppError {
    AppError::not_found("No route matches this request")
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::method_not_allowed(format!("{method} is not supported on {}", uri.path()))
}

async fn resolve_record(state: &SharedState, req: &LookupRequest) -> Result<FileRecord, AppError> {
    let index = state.ensure_index().await.map_err(AppError::index_build)?;
    let record = lookup(&index, req)?;
    Ok(record.clone())
}

async fn send_file(record: &FileRecord, attachment: bool) -> Result<Response, AppError> {
    let file = match tokio::fs::File::open(&record.absolute_path).await {
        Ok(file) => file,
        // Deleted since the last rebuild.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(TemplateError::NotFound(record.relative_path.clone()).into());
        }
        Err(err) => return Err(AppError::read(err)),
    };

    let mut builder = axum::http::Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
    if attachment {
        builder = builder.header(CONTENT_DISPOSITION, content_disposition(&record.name));
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(AppError::read)
}

/// `attachment` header with an ASCII fallback name and the exact UTF-8 name.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}

fn parse_int(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Requested item attributes; all of them when none of the names is known.
fn selected_fields(fields: Option<&str>) -> Vec<&'static str> {
    let requested: HashSet<&str> = fields
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    let selected: Vec<&'static str> = ITEM_FIELDS
        .iter()
        .copied()
        .filter(|f| requested.contains(f))
        .collect();

    if selected.is_empty() {
        ITEM_FIELDS.to_vec()
    } else {
        selected
    }
}

/// `scheme://host` of the incoming request, honouring `X-Forwarded-Proto`.
fn request_origin(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(HOST)?.to_str().ok()?.trim();
    if host.is_empty() {
        return None;
    }
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    Some(format!("{proto}://{host}"))
}

fn project(record: &FileRecord, fields: &[&str], origin: Option<&str>) -> Value {
    let base = origin.unwrap_or("");
    let mut item = Map::new();
    for &field in fields {
        let value: Value = match field {
            "id" => record.id.clone().into(),
            "name" => record.name.clone().into(),
            "relativePath" => record.relative_path.clone().into(),
            "size" => record.size.into(),
            "mtimeMs" => record.mtime_ms.into(),
            "category" => record.category.clone().into(),
            "downloadUrl" => format!("{base}/download?id={}", record.id).into(),
            "rawUrl" => format!("{base}/raw?id={}", record.id).into(),
            _ => continue,
        };
        item.insert(field.to_string(), value);
    }
    Value::Object(item)
}
