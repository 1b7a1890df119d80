//! In-process HTTP servers standing in for web pages and YouTube.

use std::net::SocketAddr;

use axum::{response::Html, routing::get, Router};

/// Serves `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A single page at `/page`.
pub async fn page(html: &'static str) -> SocketAddr {
    serve(Router::new().route("/page", get(move || async move { Html(html) }))).await
}

/// A watch page at `/watch` embedding `player` as `ytInitialPlayerResponse`,
/// plus an optional caption track at `/captions`.
pub async fn youtube(player: serde_json::Value, captions: Option<&'static str>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // caption baseUrls have to point back at this server
    let player = player
        .to_string()
        .replace("{CAPTIONS}", &format!("http://{}/captions?lang=en", addr));
    let watch = format!(
        "<html><head></head><body><script>var ytInitialPlayerResponse = {};var meta = 1;</script></body></html>",
        player
    );

    let mut router = Router::new().route(
        "/watch",
        get(move || {
            let watch = watch.clone();
            async move { Html(watch) }
        }),
    );
    if let Some(body) = captions {
        router = router.route("/captions", get(move || async move { body }));
    }

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
