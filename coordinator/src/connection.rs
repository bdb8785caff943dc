use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use log::{debug, info, warn};
use shared::{
    models::{message::Receipt, packet::WorkPacket},
    networking::{
        coordinator::CoordinatorConfig, error::NetworkingError, expect_receipt,
        result::NetworkingResult, send_message,
    },
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{error::CoordinatorResult, progress::tracker::ProgressTracker, queue::WorkQueue};

/// Serves one worker connection until the queue drains or the worker misbehaves.
///
/// Each packet goes through send, ack, done. Any failure before `done` puts the packet
/// back in the queue and ends the connection; only a checkpoint failure is returned.
///
/// When the lease runs out the packet is handed out again, but the connection keeps
/// waiting: a slow worker that still reports `done` completes the packet.
pub(crate) async fn handle_connection<S>(
    mut stream: S,
    peer: SocketAddr,
    config: Arc<CoordinatorConfig>,
    queue: Arc<WorkQueue>,
    progress: Arc<ProgressTracker>,
) -> CoordinatorResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!("Worker connected from {}", peer);

    while let Some(packet) = queue.next_packet().await {
        if let Err(e) = hand_out(&mut stream, &packet, &config).await {
            give_back(&queue, packet, peer, e);
            return Ok(());
        }

        match with_timeout(config.lease_timeout, expect_receipt(&mut stream, Receipt::Done)).await
        {
            Ok(()) => {
                let checkpoint = progress.record(&packet).await?;
                queue.retire(&packet);
                info!(
                    "Worker {} completed packet #{} ({} points), {} points delivered, {} packets pending",
                    peer,
                    packet.sequence,
                    packet.len(),
                    checkpoint.last_delivered_point_count,
                    queue.pending()
                );
            }
            Err(lease @ NetworkingError::Timeout(_)) => {
                give_back(&queue, packet.clone(), peer, lease);

                if let Err(e) = expect_receipt(&mut stream, Receipt::Done).await {
                    warn!(
                        "Worker {} gave up packet #{} after its lease: {}",
                        peer, packet.sequence, e
                    );
                    return Ok(());
                }
                let checkpoint = progress.record(&packet).await?;
                queue.settle_late(&packet);
                info!(
                    "Worker {} completed packet #{} after its lease, {} points delivered, {} packets pending",
                    peer,
                    packet.sequence,
                    checkpoint.last_delivered_point_count,
                    queue.pending()
                );
            }
            Err(e) => {
                give_back(&queue, packet, peer, e);
                return Ok(());
            }
        }
    }

    info!("No work left, closing connection to {}", peer);
    Ok(())
}

/// Sends a packet and waits for the worker to acknowledge it.
async fn hand_out<S>(
    stream: &mut S,
    packet: &WorkPacket,
    config: &CoordinatorConfig,
) -> NetworkingResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_message(stream, packet).await?;
    debug!("Sent packet #{} ({} points)", packet.sequence, packet.len());

    with_timeout(config.ack_timeout, expect_receipt(stream, Receipt::Ack)).await?;
    debug!("Packet #{} acknowledged", packet.sequence);
    Ok(())
}

fn give_back(queue: &WorkQueue, packet: WorkPacket, peer: SocketAddr, e: NetworkingError) {
    warn!(
        "Delivery of packet #{} ({} points) to {} failed: {}. Re-queueing packet.",
        packet.sequence,
        packet.len(),
        peer,
        e
    );
    queue.requeue(packet);
}

async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = NetworkingResult<T>>,
) -> NetworkingResult<T> {
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| NetworkingError::Timeout(duration))?
}

#[cfg(test)]
mod tests {
    use shared::{
        models::{checkpoint::ProgressCheckpoint, color::Color, point::Point},
        networking::{read_message, write_json_message},
        source::Anchor,
    };
    use tokio::{
        io::{duplex, DuplexStream},
        task::JoinHandle,
    };

    use super::*;
    use crate::progress::{tests::temp_checkpoint_path, FileProgressStore};

    struct Fixture {
        config: Arc<CoordinatorConfig>,
        queue: Arc<WorkQueue>,
        progress: Arc<ProgressTracker>,
    }

    fn fixture(packets: u64) -> Fixture {
        let queue = WorkQueue::new();
        for sequence in 0..packets {
            let point = Point::new(sequence as u32, 0, Color::new(0, 0, 0));
            queue.enqueue(WorkPacket::new(sequence, sequence, vec![point]));
        }
        let config = CoordinatorConfig {
            ack_timeout: Duration::from_secs(1),
            lease_timeout: Duration::from_secs(5),
            ..CoordinatorConfig::default()
        };
        Fixture {
            config: Arc::new(config),
            queue: Arc::new(queue),
            progress: Arc::new(ProgressTracker::new(
                Box::new(FileProgressStore::new(temp_checkpoint_path())),
                ProgressCheckpoint::new(Anchor::new(0, 0)),
            )),
        }
    }

    fn serve(fixture: &Fixture, stream: DuplexStream) -> JoinHandle<CoordinatorResult<()>> {
        let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
        tokio::spawn(handle_connection(
            stream,
            peer,
            Arc::clone(&fixture.config),
            Arc::clone(&fixture.queue),
            Arc::clone(&fixture.progress),
        ))
    }

    #[tokio::test]
    async fn completed_packets_are_retired() {
        let fixture = fixture(2);
        let (server, mut worker) = duplex(1024);
        let handle = serve(&fixture, server);

        for expected in 0..2 {
            let packet: WorkPacket = read_message(&mut worker).await.unwrap();
            assert_eq!(packet.sequence, expected);
            send_message(&mut worker, &Receipt::Ack).await.unwrap();
            send_message(&mut worker, &Receipt::Done).await.unwrap();
        }

        handle.await.unwrap().unwrap();
        assert!(fixture.queue.is_drained());
        assert_eq!(fixture.progress.checkpoint().last_delivered_point_count, 2);
        fixture.progress.clear().unwrap();
    }

    #[tokio::test]
    async fn wrong_token_requeues_the_packet() {
        let fixture = fixture(1);
        let (server, mut worker) = duplex(1024);
        let handle = serve(&fixture, server);

        let _: WorkPacket = read_message(&mut worker).await.unwrap();
        write_json_message(&mut worker, "\"acknowledge\"").await.unwrap();

        handle.await.unwrap().unwrap();
        assert_eq!((fixture.queue.pending(), fixture.queue.in_flight()), (1, 0));
    }

    #[tokio::test]
    async fn done_without_ack_requeues_the_packet() {
        let fixture = fixture(1);
        let (server, mut worker) = duplex(1024);
        let handle = serve(&fixture, server);

        let _: WorkPacket = read_message(&mut worker).await.unwrap();
        send_message(&mut worker, &Receipt::Done).await.unwrap();

        handle.await.unwrap().unwrap();
        assert_eq!(fixture.queue.pending(), 1);
    }

    #[tokio::test]
    async fn disconnect_after_ack_requeues_the_packet() {
        let fixture = fixture(1);
        let (server, mut worker) = duplex(1024);
        let handle = serve(&fixture, server);

        let _: WorkPacket = read_message(&mut worker).await.unwrap();
        send_message(&mut worker, &Receipt::Ack).await.unwrap();
        drop(worker);

        handle.await.unwrap().unwrap();
        assert_eq!(fixture.queue.pending(), 1);
        assert!(!fixture.queue.is_drained());
    }

    #[tokio::test(start_paused = true)]
    async fn lease_expiry_requeues_a_silent_worker() {
        let fixture = fixture(1);
        let (server, mut worker) = duplex(1024);
        let handle = serve(&fixture, server);

        let _: WorkPacket = read_message(&mut worker).await.unwrap();
        send_message(&mut worker, &Receipt::Ack).await.unwrap();

        // The worker stays connected but never reports completion.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!((fixture.queue.pending(), fixture.queue.in_flight()), (1, 0));

        drop(worker);
        handle.await.unwrap().unwrap();
        assert_eq!(fixture.queue.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_worker_still_completes_after_its_lease() {
        let fixture = fixture(1);
        let (server, mut worker) = duplex(1024);
        let handle = serve(&fixture, server);

        let _: WorkPacket = read_message(&mut worker).await.unwrap();
        send_message(&mut worker, &Receipt::Ack).await.unwrap();
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(fixture.queue.pending(), 1);
        send_message(&mut worker, &Receipt::Done).await.unwrap();

        handle.await.unwrap().unwrap();
        assert!(fixture.queue.is_drained());
        assert_eq!(fixture.progress.checkpoint().last_delivered_point_count, 1);
        fixture.progress.clear().unwrap();
    }
}
