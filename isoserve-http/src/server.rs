//! Static file server: bind, accept loop and teardown

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use isoserve_core::{Error, Result, ServerConfig, ShutdownHandle};
use isoserve_static::{FileServer, Responder};

use crate::handlers::handle_request;
use crate::headers::IsolationHeaders;

const LISTEN_BACKLOG: u32 = 1024;

/// A bound, not yet running server
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    root: PathBuf,
    responder: Arc<dyn Responder>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind a file server for `config.root`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        let files = FileServer::serve_dir(&config.root);
        Self::bind_with(config, files)
    }

    /// Bind with a custom responder. Its responses still get the isolation
    /// headers.
    pub fn bind_with<R: Responder + 'static>(config: &ServerConfig, responder: R) -> Result<Self> {
        let addr = config.addr();
        let listener = bind_listener(addr).map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        tracing::debug!("Bound listener on {} (requested {})", local_addr, addr);

        Ok(Self {
            listener,
            local_addr,
            root: config.root.clone(),
            responder: Arc::new(IsolationHeaders::new(responder)),
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Address actually bound; differs from the config when port 0 was used
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Directory being served
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle that can stop this server from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run the accept loop until a shutdown is requested.
    ///
    /// The listener is closed before this returns, and the lifecycle is
    /// `Stopped` afterwards whatever the outcome.
    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            local_addr,
            responder,
            shutdown,
            ..
        } = self;

        if !shutdown.mark_running() {
            tracing::info!("Shutdown requested before start, not serving");
            drop(listener);
            shutdown.mark_stopped();
            return Ok(());
        }

        tracing::info!("🌐 Accepting connections on http://{}", local_addr);

        loop {
            tokio::select! {
                _ = shutdown.requested() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!("Accept error: {}", e);
                            continue;
                        }
                    };
                    tokio::task::spawn(serve_connection(
                        stream,
                        peer,
                        responder.clone(),
                        shutdown.clone(),
                    ));
                }
            }
        }

        drop(listener);
        tracing::info!("Listener on {} closed", local_addr);
        shutdown.mark_stopped();
        Ok(())
    }
}

/// Serve one connection. In-flight responses finish on shutdown; idle
/// keep-alive connections are then closed.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    responder: Arc<dyn Responder>,
    shutdown: ShutdownHandle,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| handle_request(req, responder.clone(), peer));
    let conn = http1::Builder::new()
        .title_case_headers(true)
        .serve_connection(io, service);
    tokio::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        _ = shutdown.requested() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(err) = result {
        tracing::warn!("Error serving connection from {}: {:?}", peer, err);
    }
}

/// Listening socket with `SO_REUSEADDR`, so a restart can rebind at once.
fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}
