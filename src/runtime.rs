//! Cooperative run loop
//!
//! A single task owns the node and serializes every event: inbound
//! datagrams, flush ticks and bus change notifications. Bus drivers may run
//! on other threads; their changes arrive over a crossbeam channel that is
//! drained on a short timer and again before every flush.

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, interval_at, Interval, MissedTickBehavior};

use crate::constants::{BUS_POLL_INTERVAL_MS, MAX_PACKET_SIZE, STATS_LOG_INTERVAL_SECS};
use crate::dmx::{BusChange, DmxDriver};
use crate::network::Transport;
use crate::node::{Node, NodeStatus};

/// Status refresh interval when no flush tick publishes it
const STATUS_PUBLISH_INTERVAL_MS: u64 = 250;

/// Status snapshot shared with the HTTP API
pub type SharedStatus = Arc<RwLock<NodeStatus>>;

/// Create the shared status from the node's current state
pub fn shared_status<T: Transport, D: DmxDriver>(node: &Node<T, D>) -> SharedStatus {
    Arc::new(RwLock::new(node.status(Instant::now())))
}

async fn flush_tick(flush: &mut Option<Interval>) {
    match flush {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Apply every queued bus change
fn drain_changes<T: Transport, D: DmxDriver>(
    node: &mut Node<T, D>,
    changes: &Receiver<BusChange>,
) {
    for change in changes.try_iter() {
        node.handle_bus_change(change);
    }
}

/// Flush decision point; changes queued before the deadline go out with it
fn flush_due<T: Transport, D: DmxDriver>(
    node: &mut Node<T, D>,
    changes: &Receiver<BusChange>,
    now: Instant,
) -> usize {
    drain_changes(node, changes);
    node.tick(now)
}

/// Drive the node until `shutdown` resolves, then hand it back
pub async fn run<T, D, S>(
    mut node: Node<T, D>,
    socket: Arc<tokio::net::UdpSocket>,
    changes: Receiver<BusChange>,
    status: SharedStatus,
    shutdown: S,
) -> Node<T, D>
where
    T: Transport,
    D: DmxDriver,
    S: Future<Output = ()>,
{
    let start = Instant::now();
    node.start(start);
    node.log_config();

    // Immediate mode flushes from inside the event handlers
    let period = node.scheduler().period();
    let mut flush = (!period.is_zero()).then(|| {
        let mut ticker = interval_at(tokio::time::Instant::from_std(start + period), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    let mut bus_poll = interval(Duration::from_millis(BUS_POLL_INTERVAL_MS));
    bus_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut publish = interval(Duration::from_millis(STATUS_PUBLISH_INTERVAL_MS));
    publish.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats_log = interval_at(
        tokio::time::Instant::now() + Duration::from_secs(STATS_LOG_INTERVAL_SECS),
        Duration::from_secs(STATS_LOG_INTERVAL_SECS),
    );

    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    tokio::pin!(shutdown);

    tracing::info!("Bridge running");

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, from)) => {
                    if !node.handle_packet(&buf[..len]) {
                        tracing::trace!("Dropped {} bytes from {}", len, from);
                    }
                }
                Err(e) => {
                    tracing::warn!("Receive failed: {}", e);
                }
            },
            _ = flush_tick(&mut flush) => {
                let now = Instant::now();
                flush_due(&mut node, &changes, now);
                *status.write() = node.status(now);
            }
            _ = bus_poll.tick() => {
                drain_changes(&mut node, &changes);
            }
            _ = publish.tick() => {
                *status.write() = node.status(Instant::now());
            }
            _ = stats_log.tick() => {
                let stats = node.stats();
                tracing::info!(
                    "Stats: {} frames received ({} accepted, {} filtered, {} malformed, {} unrouted), {} bus changes, {} flushes sent, {} send failures",
                    stats.frames_received,
                    stats.frames_accepted,
                    stats.frames_filtered,
                    stats.frames_malformed,
                    stats.frames_unrouted,
                    stats.bus_changes,
                    stats.flushes_sent,
                    stats.send_failures
                );
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down bridge");
                break;
            }
        }
    }

    *status.write() = node.status(Instant::now());
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::dmx::{BusId, BusSet, DmxBus, VirtualBus};
    use crate::network::{create_socket, MemoryTransport};
    use crate::protocol::{ArtDmx, PortAddress};
    use crossbeam_channel::bounded;

    fn config(flush_period_ms: u64) -> AppConfig {
        let mut config = AppConfig::from_toml_str(
            r#"
            [[routes]]
            bus = 1
            universe = 0
            direction = "to_dmx"

            [[routes]]
            bus = 2
            universe = 1
            direction = "to_artnet"
            "#,
        )
        .unwrap();
        config.output.flush_period_ms = flush_period_ms;
        config
    }

    #[tokio::test]
    async fn test_run_loop_routes_and_flushes() {
        let (tx, rx) = bounded(64);
        let inbound = VirtualBus::new(BusId(1));
        let outbound = VirtualBus::with_notifier(BusId(2), tx);
        let mut buses = BusSet::new();
        buses.insert(BusId(1), inbound.clone());
        buses.insert(BusId(2), outbound.clone());

        let node = Node::new(&config(20), MemoryTransport::new(), buses).unwrap();
        let status = shared_status(&node);
        let socket = Arc::new(create_socket("127.0.0.1:0".parse().unwrap()).unwrap());
        let addr = socket.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let driver = async {
            let client = create_socket("127.0.0.1:0".parse().unwrap()).unwrap();
            let mut data = [0u8; 512];
            data[0] = 201;
            let packet = ArtDmx::new(PortAddress::new(0, 0, 0), 1, &data).encode();
            client.send_to(&packet, addr).await.unwrap();

            outbound.inject(3, 150);

            tokio::time::sleep(Duration::from_millis(150)).await;
            let _ = stop_tx.send(());
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };

        let (node, _) = tokio::join!(
            run(node, socket, rx, status.clone(), shutdown),
            driver
        );

        assert_eq!(inbound.read_channel(1), Some(201));
        assert_eq!(node.stats().frames_accepted, 1);
        assert_eq!(node.stats().bus_changes, 1);

        let sent = node.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].port, PortAddress::new(0, 0, 1));
        assert_eq!(sent[0].data[2], 150);

        assert_eq!(status.read().stats.frames_accepted, 1);
    }

    #[test]
    fn test_flush_applies_queued_changes_first() {
        let (tx, rx) = bounded(64);
        let outbound = VirtualBus::with_notifier(BusId(2), tx);
        let mut buses = BusSet::new();
        buses.insert(BusId(2), outbound.clone());

        let mut node = Node::new(&config(100), MemoryTransport::new(), buses).unwrap();
        let start = Instant::now();
        node.start(start);

        // Reported just before the deadline, not yet picked up by a bus poll
        outbound.inject(7, 42);
        assert_eq!(rx.len(), 1);

        assert_eq!(flush_due(&mut node, &rx, start + Duration::from_millis(100)), 1);
        assert!(rx.is_empty());

        let sent = node.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].port, PortAddress::new(0, 0, 1));
        assert_eq!(sent[0].data[6], 42);
    }
}
