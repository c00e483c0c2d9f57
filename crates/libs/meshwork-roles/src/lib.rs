//! Emergent role assignment for meshwork nodes.
//!
//! A node decides which functional roles to play (gateway, storage,
//! compute, router, coordinator) from its own capability snapshot plus
//! aggregated network intelligence, and broadcasts those decisions through
//! the same gossip plane the routing core runs on.

pub mod capability;
pub mod intelligence;
pub mod manager;
pub mod runtime;

mod time;

pub use capability::{build_snapshot, CapabilityPort, FallbackCapabilities, NodeCapabilitySnapshot};
pub use intelligence::{IntelligenceAggregator, MeshIntelligence};
pub use manager::{
    compute_fitness, compute_target_roles, plan_transition, EmergentRoleManager, GatewayPort,
    RolePreferences, TransitionPlan,
};
pub use runtime::RoleRuntime;
