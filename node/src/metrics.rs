//! # Prometheus Metrics
//!
//! Operational metrics for the ledger: how many operations ran and failed,
//! and the ledger-wide figures after the last one. Printed in the text
//! exposition format when the CLI runs with `--metrics`.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use prometheus::{
    Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use rebase_contracts::chain::ChainState;

/// Holds all Prometheus metric handles for the ledger.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Operations attempted, by operation name.
    pub operations_total: IntCounterVec,
    /// Operations that were reverted, by operation name.
    pub operation_failures_total: IntCounterVec,
    /// Current global interest rate per second, scaled by 1e18.
    pub interest_rate: IntGauge,
    /// Settled principal supply.
    pub total_supply: Gauge,
    /// Accounts with a ledger record.
    pub holders: IntGauge,
    /// Native base asset held by the vault.
    pub vault_reserves: Gauge,
}

impl LedgerMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("rebase".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Ledger operations attempted"),
            &["op"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_failures_total = IntCounterVec::new(
            Opts::new("operation_failures_total", "Ledger operations reverted"),
            &["op"],
        )?;
        registry.register(Box::new(operation_failures_total.clone()))?;

        let interest_rate = IntGauge::new(
            "interest_rate",
            "Global interest rate per second, scaled by 1e18",
        )?;
        registry.register(Box::new(interest_rate.clone()))?;

        let total_supply = Gauge::new("total_supply", "Settled principal supply")?;
        registry.register(Box::new(total_supply.clone()))?;

        let holders = IntGauge::new("holders", "Accounts with a ledger record")?;
        registry.register(Box::new(holders.clone()))?;

        let vault_reserves = Gauge::new("vault_reserves", "Native base asset held by the vault")?;
        registry.register(Box::new(vault_reserves.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            operation_failures_total,
            interest_rate,
            total_supply,
            holders,
            vault_reserves,
        })
    }

    /// Counts one attempt of `op`, and one failure if `ok` is false.
    pub fn observe(&self, op: &str, ok: bool) {
        self.operations_total.with_label_values(&[op]).inc();
        if !ok {
            self.operation_failures_total.with_label_values(&[op]).inc();
        }
    }

    /// Refreshes the gauges from the chain state.
    pub fn record_state(&self, state: &ChainState) {
        self.interest_rate
            .set(i64::try_from(state.token.interest_rate()).unwrap_or(i64::MAX));
        self.total_supply.set(state.token.total_supply() as f64);
        self.holders
            .set(i64::try_from(state.token.state().holder_count()).unwrap_or(i64::MAX));
        self.vault_reserves
            .set(state.vault.reserves(&state.bank) as f64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
