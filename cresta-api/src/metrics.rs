use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Counters for the hold lifecycle, exposed at `/metrics`. Everything is
/// registered against one private registry so the endpoint never picks up
/// stray process-global collectors.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    pub locks: IntCounter,
    pub lock_conflicts: IntCounter,
    pub releases: IntCounter,
    pub expiries: IntCounter,
    pub sales: IntCounter,
    pub failed_payments: IntCounter,
    pub active_holds: IntGauge,
}

impl ApiMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let locks = IntCounter::new("cresta_locks_total", "Holds successfully acquired")
            .expect("metric definition");
        let lock_conflicts = IntCounter::new(
            "cresta_lock_conflicts_total",
            "Lock attempts refused because the unit was already held",
        )
        .expect("metric definition");
        let releases = IntCounter::new("cresta_releases_total", "Holds voluntarily released")
            .expect("metric definition");
        let expiries = IntCounter::new("cresta_expiries_total", "Holds expired by the sweep worker")
            .expect("metric definition");
        let sales =
            IntCounter::new("cresta_sales_total", "Holds promoted to sales").expect("metric definition");
        let failed_payments = IntCounter::new(
            "cresta_failed_payments_total",
            "Payment attempts that reached FAILED",
        )
        .expect("metric definition");
        let active_holds = IntGauge::new("cresta_active_holds", "Holds currently inside their window")
            .expect("metric definition");

        for collector in [
            &locks,
            &lock_conflicts,
            &releases,
            &expiries,
            &sales,
            &failed_payments,
        ] {
            registry
                .register(Box::new(collector.clone()))
                .expect("metric registration");
        }
        registry
            .register(Box::new(active_holds.clone()))
            .expect("metric registration");

        Self {
            registry,
            locks,
            lock_conflicts,
            releases,
            expiries,
            sales,
            failed_payments,
            active_holds,
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Metrics encoding failed: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}
