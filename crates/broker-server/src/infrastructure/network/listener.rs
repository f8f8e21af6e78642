//! TCP accept loop for the broker.
//!
//! The listener is bound eagerly in [`BrokerService::bind`] so that a port
//! conflict is reported before the service starts serving, and so tests can
//! bind to port 0 and read back the chosen port with
//! [`BrokerService::local_addr`].

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use broker_core::{Directory, LiveSessionCount};

use crate::application::dispatch::{CommandDispatcher, OccupancySource};
use crate::infrastructure::network::{ConnectionHandler, NetworkError, ServiceSettings};

/// How long one `accept()` may block before the shutdown flag is re-checked.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Pause after a failed `accept()`, e.g. when the process is out of file
/// descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A bound broker listener, ready to serve.
pub struct BrokerService {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<ConnectionHandler>,
    sessions: Arc<LiveSessionCount>,
    slots: Option<Arc<Semaphore>>,
}

impl BrokerService {
    /// Binds the listener and logs the advertised servers.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the address is in use or the
    /// process lacks permission to bind it.
    pub async fn bind(
        settings: ServiceSettings,
        directory: Arc<Directory>,
        sessions: Arc<LiveSessionCount>,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(settings.bind_addr)
            .await
            .map_err(|source| NetworkError::BindFailed {
                addr: settings.bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(NetworkError::LocalAddr)?;

        info!("broker listening on {local_addr}");
        info!("advertising {} server(s):", directory.len());
        for (position, server) in directory.entries().iter().enumerate() {
            info!(
                "  [{position}] {} ({}) at {}:{} (capacity {}, {})",
                server.name,
                server.description,
                server.address,
                server.port,
                server.capacity,
                if server.enabled { "enabled" } else { "disabled" }
            );
        }
        if let Some(max) = settings.max_connections {
            info!("connection cap: {max}");
        }

        let occupancy: Arc<dyn OccupancySource> = sessions.clone();
        let dispatcher = CommandDispatcher::new(directory, occupancy);
        let handler = ConnectionHandler::new(Arc::new(dispatcher), settings.idle_timeout);
        let max_connections = settings.max_connections;

        Ok(Self {
            listener,
            local_addr,
            handler: Arc::new(handler),
            sessions,
            slots: max_connections.map(Semaphore::new).map(Arc::new),
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The live session counter stamped into directory responses.
    pub fn sessions(&self) -> Arc<LiveSessionCount> {
        Arc::clone(&self.sessions)
    }

    /// Accepts connections until `running` is cleared.
    ///
    /// Each connection runs in its own task.  Connections already in flight
    /// are not cancelled when the loop exits.
    pub async fn serve(self, running: Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            let accepted = timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await;
            let (stream, peer_addr) = match accepted {
                Ok(Ok(accepted)) => accepted,
                Ok(Err(e)) => {
                    back_off_after_accept_error(&e).await;
                    continue;
                }
                Err(_) => continue,
            };

            let permit = match &self.slots {
                Some(slots) => match Arc::clone(slots).try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!("connection cap reached; rejecting {peer_addr}");
                        drop(stream);
                        continue;
                    }
                },
                None => None,
            };

            let connection_id = Uuid::new_v4();
            info!("new connection from {peer_addr} (id {connection_id})");
            if let Err(e) = stream.set_nodelay(true) {
                debug!("could not set TCP_NODELAY for {peer_addr}: {e}");
            }

            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                let label = format!("{peer_addr} [{connection_id}]");
                handler.handle(stream, &label).await;
                drop(permit);
            });
        }
    }
}

/// Logs a failed `accept()` and waits before the loop tries again.
async fn back_off_after_accept_error(e: &std::io::Error) {
    error!("accept error: {e}; retrying in {ACCEPT_ERROR_BACKOFF:?}");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use broker_core::ServerAdvertisement;

    fn loopback_settings() -> ServiceSettings {
        ServiceSettings {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServiceSettings::default()
        }
    }

    fn one_server() -> Arc<Directory> {
        let avalon = ServerAdvertisement::new("Avalon", "Beginners", "127.0.0.1", 8360, 100);
        Arc::new(Directory::new(vec![avalon]).unwrap())
    }

    #[tokio::test]
    async fn test_bind_shares_the_session_counter() {
        // Arrange
        let sessions = Arc::new(LiveSessionCount::new(7));

        // Act
        let service = BrokerService::bind(loopback_settings(), one_server(), Arc::clone(&sessions))
            .await
            .unwrap();

        // Assert
        assert!(Arc::ptr_eq(&service.sessions(), &sessions));
        assert_ne!(service.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_without_cap_has_no_slots() {
        let sessions = Arc::new(LiveSessionCount::default());
        let service = BrokerService::bind(loopback_settings(), one_server(), sessions)
            .await
            .unwrap();
        assert!(service.slots.is_none());
    }

    #[tokio::test]
    async fn test_bind_with_cap_sizes_the_semaphore() {
        let settings = ServiceSettings {
            max_connections: Some(3),
            ..loopback_settings()
        };
        let sessions = Arc::new(LiveSessionCount::default());

        let service = BrokerService::bind(settings, one_server(), sessions)
            .await
            .unwrap();

        let slots = service.slots.as_ref().unwrap();
        assert_eq!(slots.available_permits(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_error_backs_off_before_retry() {
        // Arrange: EMFILE, the usual cause of a persistent accept failure
        let error = std::io::Error::from_raw_os_error(24);
        let started = tokio::time::Instant::now();

        // Act
        back_off_after_accept_error(&error).await;

        // Assert
        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }
}
