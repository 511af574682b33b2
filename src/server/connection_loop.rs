// src/server/connection_loop.rs

//! The accept loop: coarse admission (rate limiting) at accept time, a
//! bounded handoff queue, and a fixed pool of worker tasks that each invoke
//! the `RequestHandler` directly (no second re-submission stage).

use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

#[cfg(windows)]
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use super::context::{AppState, ServerContext};
use crate::connection::guard::ConnectionGuard;
use crate::core::handler::RequestHandler;
use crate::core::http::request::RequestCodec;
use crate::core::http::response::Response;

/// Waits for a shutdown signal based on the operating system: SIGINT/SIGTERM
/// on Unix, Ctrl+C on Windows.
async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        }
    }
    #[cfg(windows)]
    {
        let _ = signal::ctrl_c().await;
        info!("Ctrl-C received, shutting down");
    }
}

type Handoff = (TcpStream, SocketAddr);

/// The main server loop that accepts connections and handles graceful shutdown.
pub async fn run(mut ctx: ServerContext) {
    let queue_depth = ctx.state.config.request_queue_size;
    let worker_count = ctx.state.config.thread_pool_size;

    let (tx, rx) = mpsc::channel::<Handoff>(queue_depth);
    let rx = Arc::new(Mutex::new(rx));

    let mut workers = JoinSet::new();
    for _ in 0..worker_count {
        let rx = Arc::clone(&rx);
        let state = Arc::clone(&ctx.state);
        workers.spawn(async move { worker_loop(rx, state).await });
    }

    loop {
        tokio::select! {
            biased;

            _ = await_shutdown_signal() => break,

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => info!("a background task completed"),
                    Ok(Err(e)) => { error!(error = %e, "background task failed, shutting down"); break; }
                    Err(e) => { error!(error = %e, "background task panicked, shutting down"); break; }
                }
            },

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        let client_ip = addr.ip().to_string();
                        if ctx.state.rate_limiter.is_rate_limited(&client_ip).await {
                            warn!(client_ip, "rate limited client");
                            ctx.state.stats.record_rate_limited();
                            continue;
                        }

                        ctx.state.stats.connection_opened();
                        if tx.send((socket, addr)).await.is_err() {
                            error!("worker pool is gone, dropping accepted connection");
                        }
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                }
            },
        }
    }

    info!("shutting down: signaling workers and draining in-flight connections");
    let _ = ctx.shutdown_tx.send(());
    drop(tx);

    if tokio::time::timeout(Duration::from_secs(10), async {
        while workers.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("timed out waiting for workers to drain, aborting remaining connections");
        workers.shutdown().await;
    }

    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("timed out waiting for background tasks to finish cleanly");
    }

    info!("server shutdown complete");
}

async fn worker_loop(rx: Arc<Mutex<mpsc::Receiver<Handoff>>>, state: Arc<AppState>) {
    loop {
        let next = { rx.lock().await.recv().await };
        match next {
            Some((socket, addr)) => handle_connection(socket, addr, Arc::clone(&state)).await,
            None => break,
        }
    }
}

async fn handle_connection(socket: TcpStream, addr: SocketAddr, state: Arc<AppState>) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.stats));
    let client_ip = addr.ip().to_string();
    let deadline = Duration::from_secs(state.config.connection_timeout_secs);

    let mut framed = Framed::new(socket, RequestCodec);

    let request = match tokio::time::timeout(deadline, framed.next()).await {
        Ok(Some(Ok(mut request))) => {
            request.client_ip = client_ip;
            request
        }
        Ok(Some(Err(e))) => {
            warn!(error = %e, client_ip, "malformed request");
            send(&mut framed, Response::error(400)).await;
            return;
        }
        Ok(None) => return,
        Err(_) => {
            warn!(client_ip, "client read timed out");
            send(&mut framed, Response::error(408)).await;
            return;
        }
    };

    let handler = RequestHandler::new(
        Arc::clone(&state.filter),
        Arc::clone(&state.cache),
        Arc::clone(&state.pool),
        Arc::clone(&state.stats),
        state.config.enable_compression,
    );
    let response = handler.handle(request).await;
    send(&mut framed, response).await;
}

async fn send(framed: &mut Framed<TcpStream, RequestCodec>, response: Response) {
    let bytes = response.encode();
    if let Err(e) = framed.get_mut().write_all(&bytes).await {
        warn!(error = %e, "failed to write response to client");
    }
}
