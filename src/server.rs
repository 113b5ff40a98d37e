use std::io;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Context;
use ntex::http::StatusCode;
use ntex::web;
use ntex::util::Bytes;
use ntex::web::HttpRequest;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use spdlog::{error, info, warn};

use crate::category_map::{CategoryMap, CategoryMappings, NewCategory};
use crate::config::Config;
use crate::error::{CmsError, Result};
use crate::frontmatter::{dedup, Categories, Frontmatter};
use crate::og::{fetch_cached, HttpOgFetcher, OgCache, OgFetcher};
use crate::post_list::{build_listing, ListQuery};
use crate::post_store::PostStore;
use crate::query_string::QueryString;
use crate::util::path_safety::validate_post_id;
use crate::util::post_date::PostDate;
use crate::util::slug::suggest_category_slug;

pub struct AppState {
    config: Config,
    store: PostStore,
    category_map: RwLock<CategoryMap>,
    og_cache: Mutex<OgCache>,
    og_fetcher: Box<dyn OgFetcher + Send + Sync>,
}

impl AppState {
    pub fn new(config: Config, og_fetcher: Box<dyn OgFetcher + Send + Sync>) -> Result<AppState> {
        let category_map = CategoryMap::load(&config.paths.site_config)?;
        info!("Loaded {} category mappings from {}", category_map.len(), config.paths.site_config.display());
        let og_cache = OgCache::load(&config.paths.og_cache, config.og_ttl());

        Ok(AppState {
            store: PostStore::new(config.paths.content_dir.clone()),
            category_map: RwLock::new(category_map),
            og_cache: Mutex::new(og_cache),
            og_fetcher,
            config,
        })
    }
}

fn lock_poisoned() -> CmsError {
    CmsError::Io(io::Error::other("server state lock poisoned"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_categories: Option<Vec<NewCategory>>,
}

fn error_response(err: CmsError) -> web::HttpResponse {
    let status = match err {
        ref e if e.is_client_error() => StatusCode::BAD_REQUEST,
        CmsError::NotFound(_) => StatusCode::NOT_FOUND,
        CmsError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = match err {
        CmsError::UnmappedCategories(ref names) => ErrorBody {
            error: err.to_string(),
            new_categories: Some(names
                .iter()
                .map(|name| NewCategory { name: name.clone(), suggested_slug: suggest_category_slug(name) })
                .collect()),
        },
        ref e if status == StatusCode::INTERNAL_SERVER_ERROR => {
            error!("Request failed: {}", e);
            ErrorBody { error: "Internal server error".to_string(), new_categories: None }
        }
        ref e => {
            warn!("Request rejected: {}", e);
            ErrorBody { error: e.to_string(), new_categories: None }
        }
    };

    web::HttpResponse::build(status).json(&body)
}

fn respond<T: Serialize>(result: Result<T>) -> web::HttpResponse {
    match result {
        Ok(value) => web::HttpResponse::Ok().json(&value),
        Err(e) => error_response(e),
    }
}

/// A malformed body is a `Validation` error like any other bad input.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| CmsError::Validation(format!("invalid request body: {}", e)))
}

fn query_of(req: &HttpRequest) -> QueryString {
    QueryString::from(req.uri().query().unwrap_or(""))
}

fn required<'a>(qs: &'a QueryString, key: &str) -> Result<&'a str> {
    qs.get(key)
        .ok_or_else(|| CmsError::Validation(format!("{} is required", key)))
}

/// Stores the confirmed mappings, then refuses categories that still have no slug.
fn apply_category_mappings(state: &AppState, mappings: Option<CategoryMappings>, categories: &[String]) -> Result<()> {
    let mut map = state.category_map.write().map_err(|_| lock_poisoned())?;
    if let Some(mappings) = mappings {
        map.merge(&state.config.paths.site_config, &mappings.into_vec())?;
    }

    let missing: Vec<String> = map
        .detect_new_categories(categories)
        .into_iter()
        .map(|c| c.name)
        .collect();
    if !missing.is_empty() {
        return Err(CmsError::UnmappedCategories(missing));
    }
    Ok(())
}

#[web::get("/list")]
async fn list_posts(req: HttpRequest, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let query = ListQuery::from_query(&query_of(&req));
    let listing = state
        .store
        .load_summaries()
        .map(|posts| build_listing(posts, &query))
        .map_err(CmsError::from);
    respond(listing)
}

#[web::get("/read")]
async fn read_post(req: HttpRequest, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let qs = query_of(&req);
    let result = required(&qs, "postId").and_then(|post_id| {
        let (frontmatter, content) = state.store.read(post_id)?;
        Ok(json!({ "frontmatter": frontmatter, "content": content }))
    });
    respond(result)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest {
    post_id: String,
    frontmatter: serde_json::Value,
    #[serde(default)]
    content: String,
    #[serde(default)]
    category_mappings: Option<CategoryMappings>,
}

fn write_post(state: &AppState, req: WriteRequest) -> Result<()> {
    validate_post_id(&req.post_id)?;
    let frontmatter = Frontmatter::from_json(req.frontmatter, &req.post_id)?;
    apply_category_mappings(state, req.category_mappings, &frontmatter.categories.flatten())?;
    state.store.write(&req.post_id, &frontmatter, &req.content)?;
    info!("Post {} saved", req.post_id);
    Ok(())
}

#[web::post("/write")]
async fn save_post(body: Bytes, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let result = parse_body(&body).and_then(|req| write_post(&state, req));
    respond(result.map(|_| json!({ "success": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    category_mappings: Option<CategoryMappings>,
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    dedup(names.into_iter().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()))
}

fn create_post(state: &AppState, req: CreateRequest) -> Result<String> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(CmsError::Validation("title is required".to_string()));
    }

    let mut frontmatter = Frontmatter::new(title, PostDate::now());
    frontmatter.categories = Categories::Flat(clean_names(req.categories));
    frontmatter.tags = clean_names(req.tags);
    frontmatter.draft = req.draft;

    apply_category_mappings(state, req.category_mappings, &frontmatter.categories.flatten())?;
    state.store.create(&frontmatter, "")
}

#[web::post("/create")]
async fn new_post(body: Bytes, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let result = parse_body(&body).and_then(|req| create_post(&state, req));
    respond(result.map(|post_id| json!({ "success": true, "postId": post_id })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRequest {
    post_id: String,
}

#[web::post("/toggle-draft")]
async fn toggle_draft(body: Bytes, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let result = parse_body::<ToggleRequest>(&body).and_then(|req| state.store.toggle_draft(&req.post_id));
    respond(result.map(|draft| json!({ "success": true, "draft": draft })))
}

#[web::post("/toggle-sticky")]
async fn toggle_sticky(body: Bytes, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let result = parse_body::<ToggleRequest>(&body).and_then(|req| state.store.toggle_sticky(&req.post_id));
    respond(result.map(|sticky| json!({ "success": true, "sticky": sticky })))
}

#[derive(Deserialize)]
struct DetectRequest {
    #[serde(default)]
    categories: Vec<String>,
}

#[web::post("/detect-categories")]
async fn detect_categories(body: Bytes, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let result = parse_body::<DetectRequest>(&body).and_then(|req| {
        let map = state.category_map.read().map_err(|_| lock_poisoned())?;
        Ok(json!({ "newCategories": map.detect_new_categories(&req.categories) }))
    });
    respond(result)
}

fn fetchable_url(qs: &QueryString) -> Result<String> {
    let url = required(qs, "url")?;
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url.to_string()),
        _ => Err(CmsError::Validation(format!("not an http(s) URL: {}", url))),
    }
}

#[web::get("/og-data")]
async fn og_data(req: HttpRequest, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let url = match fetchable_url(&query_of(&req)) {
        Ok(url) => url,
        Err(e) => return error_response(e),
    };

    let entry = fetch_cached(&state.og_cache, &*state.og_fetcher, &url).await;
    web::HttpResponse::Ok().json(&entry)
}

#[web::get("/og-cache")]
async fn og_cache_dump(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let result = state
        .og_cache
        .lock()
        .map_err(|_| lock_poisoned())
        .and_then(|cache| Ok(serde_json::to_value(cache.entries())?));
    respond(result)
}

#[web::get("/config")]
async fn config_info(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let result = state
        .category_map
        .read()
        .map_err(|_| lock_poisoned())
        .map(|map| json!({
            "projectRoot": state.config.paths.project_root,
            "contentDir": state.config.paths.content_dir,
            "categoryMap": *map,
        }));
    respond(result)
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_posts)
        .service(read_post)
        .service(save_post)
        .service(new_post)
        .service(toggle_draft)
        .service(toggle_sticky)
        .service(detect_categories)
        .service(og_data)
        .service(og_cache_dump)
        .service(config_info);
}

pub async fn server_run(config: Config) -> anyhow::Result<()> {
    let fetcher = HttpOgFetcher::new(config.og_timeout(), config.og_user_agent())
        .context("Error creating the HTTP client for OG metadata")?;

    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;
    info!("Serving posts from {}", config.paths.content_dir.display());

    let app_state = Arc::new(AppState::new(config, Box::new(fetcher))?);

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .configure(routes)
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await?;

    Ok(())
}
