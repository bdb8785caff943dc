pub mod drawing;
pub mod rate_limiter;

use log::{debug, error, info, warn};
use shared::{
    canvas::Canvas,
    models::{message::Receipt, packet::WorkPacket},
    networking::{
        error::NetworkingError, result::NetworkingResult, send_message, try_read_message,
        worker::WorkerConfig,
    },
};
use tokio::{net::TcpStream, time::sleep};

use crate::{drawing::draw_packet, rate_limiter::RateLimiter};

/// Why a session with the coordinator ended.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The coordinator is unreachable or the connection dropped.
    #[error("transport error: {0}")]
    Transport(NetworkingError),

    /// The coordinator sent something that is not a valid packet.
    #[error("protocol error: {0}")]
    Protocol(NetworkingError),
}

impl From<NetworkingError> for SessionError {
    fn from(e: NetworkingError) -> Self {
        if e.is_transport() {
            Self::Transport(e)
        } else {
            Self::Protocol(e)
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Runs the worker forever: connect, serve packets, and reconnect after any failure.
pub async fn run_worker<C: Canvas>(worker: WorkerConfig, canvas: C) {
    info!("Worker launched: {}", worker.name);

    let mut limiter = RateLimiter::new(worker.refresh_interval);
    limiter.refresh(&canvas).await;

    loop {
        match run_session(&worker, &canvas, &mut limiter).await {
            Ok(()) => info!("Coordinator closed the connection"),
            Err(SessionError::Transport(e)) => warn!("Connection to coordinator lost: {}", e),
            Err(SessionError::Protocol(e)) => error!("Dropping connection: {}", e),
        }
        info!("Reconnecting in {:?}", worker.reconnect_backoff);
        sleep(worker.reconnect_backoff).await;
    }
}

/// Serves packets over a single connection.
///
/// Returns `Ok` when the coordinator hangs up between packets. A malformed packet is
/// never acknowledged; the session ends so the next one starts from a clean stream.
pub async fn run_session<C: Canvas>(
    worker: &WorkerConfig,
    canvas: &C,
    limiter: &mut RateLimiter,
) -> SessionResult<()> {
    let mut stream = connect_to_coordinator(&worker.coordinator_addr()).await?;

    loop {
        limiter.refresh_if_due(canvas).await;

        let packet: WorkPacket = match try_read_message(&mut stream).await? {
            Some(packet) => packet,
            None => return Ok(()),
        };
        info!(
            "Received work packet #{} with {} pixels",
            packet.sequence,
            packet.len()
        );

        send_message(&mut stream, &Receipt::Ack).await?;
        debug!("Acknowledged packet #{}", packet.sequence);

        let report = draw_packet(canvas, &packet, limiter, worker).await;

        send_message(&mut stream, &Receipt::Done).await?;
        info!(
            "Work packet #{} completed ({} drawn, {} skipped) and reported to coordinator",
            packet.sequence, report.drawn, report.skipped
        );
    }
}

async fn connect_to_coordinator(addr: &str) -> NetworkingResult<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    info!("Connected to coordinator at {}", addr);
    Ok(stream)
}
