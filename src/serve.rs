use std::{
    convert::Infallible,
    env, fs,
    future::Future,
    net::SocketAddr,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use anyhow::{Context as _, Result};
use hyper::{
    header::{CACHE_CONTROL, CONTENT_TYPE},
    Body, Method, Request, Response, StatusCode,
};
use tower::Service;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::{helpers::copy_dir, site::Site, STREETPRESS_BANNER};

// The temporal static dir, builtin assets overlaid by the site's own.
static TEMP_STATIC_DIR: &str = "__streetpress_static";

pub async fn run_serve(site: Site, source: &Path, port: u16, open_browser: bool) -> Result<()> {
    let static_root = prepare_static_dir(source)?;

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let serving_url = format!("http://{addr}");
    println!("{STREETPRESS_BANNER}");
    info!("listening on {serving_url}");

    let serve_dir = ServeDir::new(&static_root).fallback(SiteService {
        site: Arc::new(site),
    });

    if open_browser {
        if let Err(err) = opener::open(&serving_url) {
            error!("Failed to open {serving_url}: {err}");
        }
    }

    hyper::Server::try_bind(&addr)
        .with_context(|| format!("Failed to listen on {addr}"))?
        .serve(tower::make::Shared::new(serve_dir))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {err}");
            }
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

// Extract the embedded assets into a temp dir, then copy the site's
// `static` directory over them. Return the root served by `ServeDir`.
fn prepare_static_dir(source: &Path) -> Result<PathBuf> {
    let root = env::temp_dir().join(TEMP_STATIC_DIR);
    if root.exists() {
        // Remove the outdated assets of the last run.
        fs::remove_dir_all(&root)?;
    }
    let dest_static_dir = root.join("static");
    fs::create_dir_all(&dest_static_dir)?;
    include_dir::include_dir!("static")
        .extract(&dest_static_dir)
        .context("Failed to extract the builtin static files")?;

    let static_dir = source.join("static");
    if static_dir.exists() {
        copy_dir(&static_dir, &dest_static_dir)?;
    }
    Ok(root)
}

// Render every request `ServeDir` can't find a file for.
#[derive(Clone)]
struct SiteService {
    site: Arc<Site>,
}

impl Service<Request<Body>> for SiteService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let site = Arc::clone(&self.site);
        let method = req.method().clone();
        let uri = req.uri().clone();
        Box::pin(async move {
            if method != Method::GET && method != Method::HEAD {
                return Ok(plain_response(
                    StatusCode::METHOD_NOT_ALLOWED,
                    "405 Method Not Allowed",
                ));
            }

            let reply = site.handle(uri.path(), uri.query()).await;
            info!("{method} {uri} {}", reply.status.as_u16());
            let body = if method == Method::HEAD {
                Body::empty()
            } else {
                Body::from(reply.body)
            };
            Ok(Response::builder()
                .status(reply.status)
                .header(CONTENT_TYPE, reply.content_type)
                .header(CACHE_CONTROL, "no-cache")
                .body(body)
                .unwrap_or_else(|_| {
                    plain_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
                }))
        })
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp
}
