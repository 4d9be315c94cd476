use crate::assets;
use crate::connection::serve_connection;
use crate::error::ServerError;
use crate::settings::ServerSettings;
use chem_index::context::Context;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{debug, warn};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Path clients open their websocket on.
pub const WEBSOCKET_PATH: &str = "/underdark";

async fn handle(
    mut req: Request<Body>,
    context: Arc<Context>,
    settings: Arc<ServerSettings>,
) -> Result<Response<Body>, Infallible> {
    if req.uri().path() == WEBSOCKET_PATH {
        if !hyper_tungstenite::is_upgrade_request(&req) {
            return Ok(assets::status(StatusCode::BAD_REQUEST));
        }

        let response = match hyper_tungstenite::upgrade(&mut req, None) {
            Ok((response, websocket)) => {
                tokio::spawn(async move {
                    match websocket.await {
                        Ok(socket) => serve_connection(socket, context, settings).await,
                        Err(e) => warn!("Websocket handshake failed: {}", e),
                    }
                });
                response
            }
            Err(e) => {
                warn!("Bad websocket upgrade: {}", e);
                assets::status(StatusCode::BAD_REQUEST)
            }
        };

        return Ok(response);
    }

    if !matches!(*req.method(), Method::GET | Method::HEAD) {
        return Ok(assets::status(StatusCode::METHOD_NOT_ALLOWED));
    }

    let path = req.uri().path().to_string();
    let response = assets::serve(&settings.assets_dir, &path).await;

    Ok(response)
}

/// Binds `addr` and returns the bound address together with the server future.
///
/// Port 0 picks a free port.
pub fn bind(
    addr: SocketAddr,
    context: Arc<Context>,
    settings: Arc<ServerSettings>,
) -> Result<(SocketAddr, impl Future<Output = hyper::Result<()>>), ServerError> {
    // For every connection, we must make a `Service` to handle all
    // incoming HTTP requests on said connection.
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let remote = conn.remote_addr();
        let context = context.clone();
        let settings = settings.clone();

        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                debug!("{} {} from {}", req.method(), req.uri().path(), remote);
                handle(req, context.clone(), settings.clone())
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    let local_addr = server.local_addr();

    Ok((local_addr, server))
}
