use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use std::{
    net::SocketAddr,
    path::{Component, Path, PathBuf},
};
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

use super::pages::load_project;

/// Injected before `</body>` of every served page
const RELOAD_SCRIPT: &str = r#"<script>
    // Hot reload via Server-Sent Events
    const eventSource = new EventSource('/_reload');
    eventSource.onmessage = () => location.reload();
    eventSource.onerror = () => eventSource.close();
</script>"#;

#[derive(Clone)]
struct AppState {
    root: PathBuf,
    reload_tx: broadcast::Sender<()>,
}

/// Serve the rendered site with live reload for local development.
///
/// This command:
/// - Serves the configured output directory as static files
/// - Injects a reload script into HTML pages
/// - Watches the output directory and reloads open pages on change
///
/// # Arguments
///
/// * `path` - Project directory containing site-kit.toml
/// * `port` - Port to serve on (default: 3000)
pub async fn run(path: PathBuf, port: u16) -> Result<()> {
    println!("🌐 Starting preview server...");

    let config = load_project(&path)?;
    let root = config.output_dir(&path);
    if !root.exists() {
        anyhow::bail!(
            "Output directory does not exist: {}\nRun 'site-kit build {}' first",
            root.display(),
            path.display()
        );
    }
    println!("   Serving: {}", root.display());

    let (reload_tx, _) = broadcast::channel::<()>(100);

    let state = AppState {
        root: root.clone(),
        reload_tx: reload_tx.clone(),
    };

    let app = Router::new()
        .route("/_reload", get(sse_handler))
        .fallback(site_handler)
        .with_state(state);

    let watcher_tx = reload_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = watch_files(root, watcher_tx).await {
            warn!(error = %e, "file watcher stopped");
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Watch for file changes and trigger reload
async fn watch_files(path: PathBuf, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut watcher =
        notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })?;

    watcher.watch(&path, RecursiveMode::Recursive)?;

    while let Some(event) = rx.recv().await {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => {
                // Filter out temporary files and hidden files
                if event.paths.iter().any(|p| {
                    let filename = p.file_name().unwrap_or_default().to_string_lossy();
                    !filename.starts_with('.') && !filename.ends_with('~')
                }) {
                    println!("   📝 File changed, reloading...");
                    let _ = reload_tx.send(());
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// SSE endpoint for hot reload
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let mut rx = state.reload_tx.subscribe();

    let stream = async_stream::stream! {
        loop {
            if rx.recv().await.is_ok() {
                yield Ok(Event::default().data("reload"));
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// HTML pages get the reload script; everything else is served from disk as-is
async fn site_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if let Some(page) = resolve_page(&state.root, request.uri().path()) {
        match tokio::fs::read_to_string(&page).await {
            Ok(html) => return Html(inject_reload_script(&html)).into_response(),
            Err(e) => debug!(page = %page.display(), error = %e, "falling back to static serving"),
        }
    }

    match ServeDir::new(&state.root).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Map a request path to an HTML file under `root`: `/` and `/dir/` serve
/// `index.html`. Paths that try to leave `root` resolve to nothing.
fn resolve_page(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let relative = uri_path.trim_start_matches('/');
    let mut file = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => file.push(segment),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if uri_path.ends_with('/') || file.is_dir() {
        file.push("index.html");
    }

    let is_html = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
    (is_html && file.is_file()).then_some(file)
}

fn inject_reload_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(index) => format!("{}{}\n{}", &html[..index], RELOAD_SCRIPT, &html[index..]),
        None => format!("{}\n{}", html, RELOAD_SCRIPT),
    }
}
