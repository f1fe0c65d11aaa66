use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{Instrument, error, info, info_span};

use crate::session::SessionHandler;

/// Accepts client connections and runs one session task per connection.
pub struct Listener {
    listener: TcpListener,
    handler: SessionHandler,
}

impl Listener {
    pub async fn bind(addr: impl ToSocketAddrs, handler: SessionHandler) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("Failed to bind listener")?;
        Ok(Self { listener, handler })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listener address")
    }

    /// Accept connections until `shutdown` resolves. Running sessions are left to finish
    /// on their own.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(addr = %self.local_addr()?, "Listening for clients");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Listener stopping");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            if let Err(err) = stream.set_nodelay(true) {
                                error!(%peer, error = %err, "Failed to set TCP_NODELAY");
                            }
                            info!(%peer, "Client connected");
                            let handler = self.handler.clone();
                            tokio::spawn(
                                async move {
                                    handler.handle(stream).await;
                                }
                                .instrument(info_span!("session", %peer)),
                            );
                        }
                        // Usually fd exhaustion; keep serving existing sessions.
                        Err(err) => error!(error = %err, "Accept failed"),
                    }
                }
            }
        }
    }

    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }
}
