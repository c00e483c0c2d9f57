//! Glue between the role machinery and a running mesh node: gossip intake
//! feeds the aggregator, a periodic pass re-evaluates roles, and queued
//! announcements go back out through the node's send path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use meshwork_mesh::{MeshNode, NodeProfile};
use meshwork_wire::types::MeshRole;
use meshwork_wire::MmcpBody;

use crate::capability::{build_snapshot, CapabilityPort};
use crate::intelligence::IntelligenceAggregator;
use crate::manager::{compute_fitness, EmergentRoleManager};

pub struct RoleRuntime {
    manager: Arc<Mutex<EmergentRoleManager>>,
    aggregator: Arc<Mutex<IntelligenceAggregator>>,
    cancel: CancellationToken,
}

impl RoleRuntime {
    pub fn spawn(
        node: Arc<MeshNode>,
        capability: Arc<dyn CapabilityPort>,
        manager: EmergentRoleManager,
        aggregator: IntelligenceAggregator,
        pass_interval: Duration,
    ) -> Self {
        let manager = Arc::new(Mutex::new(manager));
        let aggregator = Arc::new(Mutex::new(aggregator));
        let cancel = CancellationToken::new();

        // Gossip intake: population counts come only from what peers
        // announce; heartbeats acknowledge our own announced roles.
        {
            let manager = manager.clone();
            let aggregator = aggregator.clone();
            let cancel = cancel.clone();
            let mut inbound = node.mmcp_stream();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        event = inbound.recv() => {
                            let event = match event {
                                Ok(event) => event,
                                Err(broadcast::error::RecvError::Closed) => break,
                                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                    log::debug!("roles: gossip intake lagged by {}", skipped);
                                    continue;
                                }
                            };

                            let now = Instant::now();
                            match &event.message.body {
                                MmcpBody::NodeAnnouncement(announcement) => {
                                    aggregator.lock().await.observe_announcement(announcement, now);
                                }
                                MmcpBody::StorageAdvertisement(advert) => {
                                    aggregator.lock().await.observe_storage(advert, now);
                                }
                                MmcpBody::NetworkMetrics(metrics) => {
                                    aggregator.lock().await.observe_metrics(metrics, now);
                                }
                                MmcpBody::Heartbeat(_) => {
                                    manager.lock().await.observe_heartbeat();
                                }
                                _ => {}
                            }
                        }
                    }
                }
            });
        }

        // Role pass: snapshot, aggregate, evaluate, announce.
        {
            let manager = manager.clone();
            let aggregator = aggregator.clone();
            let cancel = cancel.clone();
            let node = node.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(pass_interval) => {
                            run_pass(&node, capability.as_ref(), &manager, &aggregator).await;
                        }
                    }
                }
            });
        }

        Self { manager, aggregator, cancel }
    }

    pub fn manager(&self) -> Arc<Mutex<EmergentRoleManager>> {
        self.manager.clone()
    }

    pub fn aggregator(&self) -> Arc<Mutex<IntelligenceAggregator>> {
        self.aggregator.clone()
    }

    pub async fn current_roles(&self) -> Vec<MeshRole> {
        self.manager.lock().await.current_roles().into_iter().collect()
    }

    /// Run one pass immediately, out of cycle.
    pub async fn evaluate_now(&self, node: &MeshNode, capability: &dyn CapabilityPort) {
        run_pass(node, capability, &self.manager, &self.aggregator).await;
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RoleRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_pass(
    node: &MeshNode,
    capability: &dyn CapabilityPort,
    manager: &Arc<Mutex<EmergentRoleManager>>,
    aggregator: &Arc<Mutex<IntelligenceAggregator>>,
) {
    let now = Instant::now();
    let intel = aggregator.lock().await.intelligence(now);
    let neighbor_count = node.neighbors().await.len();

    let (outbox, profile) = {
        let mut manager = manager.lock().await;
        let snapshot = build_snapshot(capability, manager.node_id()).await;
        manager.evaluate(&snapshot, &intel, neighbor_count, now);

        let roles = manager.current_roles();
        let primary = roles.iter().copied().max().unwrap_or(MeshRole::MeshParticipant);
        let profile = NodeProfile {
            fitness_score: (compute_fitness(&snapshot) * 100.0) as i32,
            node_role: primary as u8,
            centrality_score: 0.0,
        };
        (manager.take_outbox(), profile)
    };

    // Fresh figures ride the next origination.
    node.set_profile(profile).await;

    for message in outbox {
        if node.broadcast_control(message).await.is_err() {
            break;
        }
    }
}
