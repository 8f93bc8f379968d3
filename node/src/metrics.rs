//! Prometheus metrics for the game node.
//!
//! [`GameMetrics`] owns a dedicated [`Registry`] that the RPC `/api/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct GameMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Requests rejected by init-data verification.
    pub auth_failures: IntCounter,
    /// Tasks newly marked done (replays are not counted).
    pub tasks_completed: IntCounter,
    /// Cities revealed.
    pub cities_opened: IntCounter,
    /// Inviters credited for a new user.
    pub referrals_credited: IntCounter,
    /// External checks that answered "no" or could not run.
    pub check_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Number of user records in the store.
    pub users: IntGauge,
}

impl GameMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let auth_failures = register_int_counter_with_registry!(
            Opts::new(
                "visarun_auth_failures_total",
                "Requests rejected by init-data verification"
            ),
            registry
        )
        .expect("failed to register auth_failures counter");

        let tasks_completed = register_int_counter_with_registry!(
            Opts::new("visarun_tasks_completed_total", "Tasks completed"),
            registry
        )
        .expect("failed to register tasks_completed counter");

        let cities_opened = register_int_counter_with_registry!(
            Opts::new("visarun_cities_opened_total", "Cities revealed"),
            registry
        )
        .expect("failed to register cities_opened counter");

        let referrals_credited = register_int_counter_with_registry!(
            Opts::new(
                "visarun_referrals_credited_total",
                "Inviters credited for a new user"
            ),
            registry
        )
        .expect("failed to register referrals_credited counter");

        let check_failures = register_int_counter_with_registry!(
            Opts::new(
                "visarun_check_failures_total",
                "External task checks that failed or could not run"
            ),
            registry
        )
        .expect("failed to register check_failures counter");

        let users = register_int_gauge_with_registry!(
            Opts::new("visarun_users", "Number of known users"),
            registry
        )
        .expect("failed to register users gauge");

        Self {
            registry,
            auth_failures,
            tasks_completed,
            cities_opened,
            referrals_credited,
            check_failures,
            users,
        }
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self::new()
    }
}
