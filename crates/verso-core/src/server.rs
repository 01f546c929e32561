//! HTTP server mount
//!
//! Binds the frozen [`App`](crate::App) to a TCP listener and feeds incoming
//! hyper requests through the dispatch pipeline. The transport owns nothing
//! version-related; it only buffers bodies and hands the pipeline a request
//! head.

use crate::router::App;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

impl App {
    /// Serve the app on the given address until the task is dropped.
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("verso listening on http://{}", addr);

        loop {
            let (stream, _remote) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let app = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let app = app.clone();
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = match body.collect().await {
                            Ok(collected) => collected.to_bytes(),
                            Err(err) => {
                                error!("failed to read request body: {err}");
                                bytes::Bytes::new()
                            }
                        };
                        let req = hyper::Request::from_parts(parts, body);
                        Ok::<_, Infallible>(app.handle(req).await)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("connection error: {err}");
                }
            });
        }
    }
}
