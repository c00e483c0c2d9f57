use std::time::Duration;

/// Tunables for one mesh node. Defaults follow the protocol's reference
/// timings; tests shrink the intervals to keep wall-clock short.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub name: String,
    pub max_hops: u8,
    pub origination_interval: Duration,
    pub origination_initial_delay: Duration,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub lost_node_threshold: Duration,
    pub lost_node_sweep_interval: Duration,
    pub user_allows_tor_proxy: bool,
}

impl MeshConfig {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn set_max_hops(&mut self, max_hops: u8) {
        self.max_hops = max_hops;
    }

    pub fn set_origination_interval(&mut self, interval: Duration) {
        self.origination_interval = interval;
    }

    pub fn set_origination_initial_delay(&mut self, delay: Duration) {
        self.origination_initial_delay = delay;
    }

    pub fn set_ping_interval(&mut self, interval: Duration) {
        self.ping_interval = interval;
    }

    pub fn set_ping_timeout(&mut self, timeout: Duration) {
        self.ping_timeout = timeout;
    }

    pub fn set_lost_node_threshold(&mut self, threshold: Duration) {
        self.lost_node_threshold = threshold;
    }

    pub fn set_lost_node_sweep_interval(&mut self, interval: Duration) {
        self.lost_node_sweep_interval = interval;
    }

    pub fn set_user_allows_tor_proxy(&mut self, allows: bool) {
        self.user_allows_tor_proxy = allows;
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            name: "mesh".into(),
            max_hops: 7,
            origination_interval: Duration::from_secs(3),
            origination_initial_delay: Duration::from_secs(1),
            ping_interval: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(15),
            lost_node_threshold: Duration::from_secs(10),
            lost_node_sweep_interval: Duration::from_secs(1),
            user_allows_tor_proxy: false,
        }
    }
}
