use actix_web::{delete, get, post, web, App, HttpResponse, HttpServer, Responder};
use futures::StreamExt;
use log::{error, info, warn, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use rust_manga_tracker::app_state::AppState;
use rust_manga_tracker::config::Config;
use rust_manga_tracker::db::SqliteStore;
use rust_manga_tracker::models::{Notification, Page, TitleCard};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

const LOG_CONFIG: &str = "log4rs.yml";

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<usize>,
    source: Option<String>,
}

#[derive(Deserialize)]
struct ChaptersQuery {
    url: String,
    name: Option<String>,
    page: Option<usize>,
}

#[derive(Deserialize)]
struct SubscribeRequest {
    user_id: String,
    url: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct UnsubscribeRequest {
    user_id: String,
    /// Without a url every subscription of the user is removed
    url: Option<String>,
}

#[derive(Deserialize)]
struct SubsQuery {
    filter: Option<String>,
}

#[get("/search")]
async fn search(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let q = query.q.clone().unwrap_or_default();
    let page = query.page.unwrap_or(1);

    let results = match &query.source {
        Some(source) => match data.registry.get(source) {
            Some(adapter) => vec![(adapter.id().clone(), adapter.search(&q, page).await)],
            None => {
                return HttpResponse::NotFound()
                    .json(serde_json::json!({"error": format!("Unknown source: {}", source)}))
            }
        },
        None => data.registry.search_all(&q, page).await,
    };

    let total: usize = results.iter().map(|(_, cards)| cards.len()).sum();
    info!("Search '{}' page {} returned {} titles", q, page, total);

    let grouped: Vec<serde_json::Value> = results
        .into_iter()
        .map(|(source, titles)| serde_json::json!({"source": source, "titles": titles}))
        .collect();
    HttpResponse::Ok().json(serde_json::json!({"page": page, "results": grouped}))
}

#[get("/chapters")]
async fn get_chapters(data: web::Data<AppState>, query: web::Query<ChaptersQuery>) -> impl Responder {
    let adapter = match data.registry.resolve(&query.url) {
        Ok(adapter) => adapter,
        Err(e) => return HttpResponse::NotFound().json(serde_json::json!({"error": e.to_string()})),
    };

    let card = TitleCard::new(
        adapter.id().clone(),
        query.name.clone().unwrap_or_default(),
        query.url.clone(),
        "",
    );
    let chapters = match adapter.fetch_chapters(&card).await {
        Ok(chapters) => chapters,
        Err(e) => {
            error!("[{}] Failed to fetch chapters for {}: {}", adapter.name(), query.url, e);
            return HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()}));
        }
    };

    let page = query.page.unwrap_or(1);
    HttpResponse::Ok().json(Page {
        data: data.pager.page(&chapters, page),
        page,
        page_size: data.pager.page_size(),
        has_more: data.pager.has_more(chapters.len(), page),
    })
}

#[post("/subscriptions")]
async fn subscribe(data: web::Data<AppState>, body: web::Json<SubscribeRequest>) -> impl Responder {
    let adapter = match data.registry.resolve(&body.url) {
        Ok(adapter) => adapter,
        Err(e) => return HttpResponse::NotFound().json(serde_json::json!({"error": e.to_string()})),
    };
    let name = body.name.clone().unwrap_or_else(|| body.url.clone());

    // Newest chapter comes first in every supported listing.
    let latest = adapter
        .iter_chapters(&body.url, &name)
        .next()
        .await
        .map(|chapter| chapter.url);

    match data
        .store
        .subscribe(&body.user_id, &body.url, &name, latest.as_deref())
    {
        Ok(()) => {
            info!("User {} subscribed to {} ({})", body.user_id, name, adapter.name());
            HttpResponse::Created().json(serde_json::json!({
                "title_url": body.url,
                "name": name,
                "last_chapter": latest,
            }))
        }
        Err(e) => {
            error!("Failed to subscribe {} to {}: {}", body.user_id, body.url, e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

#[delete("/subscriptions")]
async fn unsubscribe(data: web::Data<AppState>, body: web::Json<UnsubscribeRequest>) -> impl Responder {
    let result = match &body.url {
        Some(url) => data.store.unsubscribe(&body.user_id, url).map(usize::from),
        None => data.store.erase_subs(&body.user_id),
    };

    match result {
        Ok(removed) => HttpResponse::Ok().json(serde_json::json!({"removed": removed})),
        Err(e) => {
            error!("Failed to unsubscribe {}: {}", body.user_id, e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

#[get("/subscriptions/{user_id}")]
async fn list_subscriptions(
    data: web::Data<AppState>,
    user_id: web::Path<String>,
    query: web::Query<SubsQuery>,
) -> impl Responder {
    let filters: Vec<String> = query
        .filter
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    match data.store.get_subs(&user_id, &filters) {
        Ok(subs) => HttpResponse::Ok().json(subs),
        Err(e) => {
            error!("Failed to list subscriptions of {}: {}", user_id, e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

#[post("/check")]
async fn run_check(data: web::Data<AppState>) -> impl Responder {
    info!("Manual update check requested");
    HttpResponse::Ok().json(data.scheduler.run_once().await)
}

#[get("/check")]
async fn last_check(data: web::Data<AppState>) -> impl Responder {
    match data.scheduler.last_summary() {
        Some(summary) => HttpResponse::Ok().json(summary),
        None => HttpResponse::Ok().json(serde_json::json!({"status": "never run"})),
    }
}

#[get("/sources")]
async fn get_sources(data: web::Data<AppState>) -> impl Responder {
    let sources: Vec<serde_json::Value> = data
        .registry
        .adapters()
        .iter()
        .map(|a| serde_json::json!({"id": a.id(), "name": a.name(), "base_url": a.base_url()}))
        .collect();
    HttpResponse::Ok().json(sources)
}

#[get("/metrics")]
async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    let all_metrics = data.metrics.get_all_metrics();

    let metrics_json: Vec<serde_json::Value> = all_metrics
        .iter()
        .map(|m| {
            serde_json::json!({
                "adapter": m.adapter,
                "success_rate": format!("{:.2}%", m.success_rate()),
                "total_requests": m.total_requests,
                "successful_requests": m.successful_requests,
                "failed_requests": m.failed_requests,
                "average_response_time_ms": format!("{:.2}", m.average_response_time_ms),
                "rate_limit_hits": m.rate_limit_hits,
                "timeout_count": m.timeout_count,
                "last_success": m.last_success,
                "last_failure": m.last_failure,
                "last_error": m.last_error,
            })
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "metrics": metrics_json,
        "total_sources_tracked": all_metrics.len()
    }))
}

/// `log4rs.yml` when present, plain console logging otherwise.
fn init_logging() {
    if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}")))
            .build();
        let fallback = log4rs::Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info));
        match fallback {
            Ok(config) => {
                if log4rs::init_config(config).is_ok() {
                    warn!("{} not loaded ({}), logging to console", LOG_CONFIG, e);
                }
            }
            Err(err) => eprintln!("Failed to configure logging: {}", err),
        }
    }
}

async fn log_notifications(mut rx: mpsc::Receiver<Notification>) {
    while let Some(n) = rx.recv().await {
        info!(
            "[{}] New chapter {} for {} -> notifying {} subscriber(s)",
            n.source,
            n.chapter_url,
            n.title_url,
            n.subscribers.len()
        );
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let cfg = Config::load();

    let store = SqliteStore::open(&cfg.database_path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let enhanced_client = cfg
        .http
        .create_http_client()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    log::info!("Enhanced HTTP client initialized:");
    log::info!("  Max retries: {}", cfg.http.max_retries);
    log::info!("  Timeout: {}s", cfg.http.timeout_secs);

    let (tx, rx) = mpsc::channel(256);
    let data = web::Data::new(AppState::build(
        cfg.clone(),
        Arc::new(enhanced_client),
        Arc::new(store),
        Some(tx),
    ));
    info!("{} adapter(s) registered", data.registry.len());

    actix_web::rt::spawn(log_notifications(rx));
    if cfg.scheduler.enabled {
        actix_web::rt::spawn(data.scheduler.clone().run());
    } else {
        info!("Update scheduler disabled");
    }

    // Try the configured port first, then the next few
    let mut last_err: Option<std::io::Error> = None;
    for port in cfg.port..=cfg.port.saturating_add(10) {
        let data_clone = data.clone();
        let addr = format!("{}:{}", cfg.bind_address, port);
        match HttpServer::new(move || {
            App::new()
                .app_data(data_clone.clone())
                .service(search)
                .service(get_chapters)
                .service(subscribe)
                .service(unsubscribe)
                .service(list_subscriptions)
                .service(run_check)
                .service(last_check)
                .service(get_sources)
                .service(get_metrics)
        })
        .bind(&addr)
        {
            Ok(server) => {
                info!("Server listening on http://{}", addr);
                return server.run().await;
            }
            Err(e) => {
                warn!("Port {} unavailable: {}", port, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::AddrInUse, "no port available")))
}
