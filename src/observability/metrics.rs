//! Prometheus metrics.
//!
//! Counters and histograms are recorded through the `metrics` facade
//! everywhere in the crate. When enabled, a Prometheus recorder with an
//! HTTP scrape listener is installed; otherwise the facade's no-op
//! recorder discards them.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::thread;

/// Default scrape port.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are exported.
    pub enabled: bool,
    /// Address to bind the scrape listener.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    fn resolve(settings: &MetricsSettings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut enabled = settings.enabled.unwrap_or(false);
        let mut port = settings.port.unwrap_or(DEFAULT_METRICS_PORT);

        if let Some(value) = parse_bool(lookup("PROMPTGRAPH_METRICS_ENABLED")) {
            enabled = value;
        }
        if let Some(value) = parse_port(lookup("PROMPTGRAPH_METRICS_PORT")) {
            port = value;
        }

        Self {
            enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }
}

/// Installs the Prometheus recorder and HTTP listener when enabled.
///
/// # Errors
///
/// Returns an error if the recorder or listener cannot be installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }
    let builder = PrometheusBuilder::new().with_http_listener(config.listen_addr);
    let handle = install_listener(builder)?;
    tracing::info!(addr = %config.listen_addr, "Prometheus metrics listener started");
    Ok(Some(handle))
}

fn install_listener(builder: PrometheusBuilder) -> Result<PrometheusHandle> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        return install_with_runtime(builder, &handle);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::operation("metrics_runtime_init", e))?;
    let handle = runtime.handle().clone();
    let prometheus = install_with_runtime(builder, &handle)?;
    thread::Builder::new()
        .name("metrics-exporter-prometheus-http".to_string())
        .spawn(move || runtime.block_on(std::future::pending::<()>()))
        .map_err(|e| Error::operation("metrics_runtime_thread", e))?;
    Ok(prometheus)
}

fn install_with_runtime(
    builder: PrometheusBuilder,
    runtime_handle: &tokio::runtime::Handle,
) -> Result<PrometheusHandle> {
    let (recorder, exporter) = {
        let _guard = runtime_handle.enter();
        builder
            .build()
            .map_err(|e| Error::operation("metrics_exporter_build", e))?
    };
    let handle = recorder.handle();
    set_global_recorder(recorder)?;
    runtime_handle.spawn(exporter);
    Ok(handle)
}

fn set_global_recorder(recorder: PrometheusRecorder) -> Result<()> {
    metrics::set_global_recorder(recorder)
        .map_err(|e| Error::operation("metrics_recorder_install", e))
}

fn parse_bool(value: Option<String>) -> Option<bool> {
    value.map(|value| {
        let value = value.trim().to_lowercase();
        value == "true" || value == "1" || value == "yes"
    })
}

fn parse_port(value: Option<String>) -> Option<u16> {
    value.and_then(|value| value.trim().parse::<u16>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry_smoke() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("suggestions_total", "mode" => "ranked").increment(1);
        });
        let rendered = handle.render();
        assert!(rendered.contains("suggestions_total"));
    }

    #[test]
    fn test_settings_with_env_overrides() {
        let settings = MetricsSettings {
            enabled: Some(false),
            port: Some(9100),
        };
        let config = MetricsConfig::resolve(&settings, |key| match key {
            "PROMPTGRAPH_METRICS_ENABLED" => Some("YES".to_string()),
            "PROMPTGRAPH_METRICS_PORT" => Some("not-a-port".to_string()),
            _ => None,
        });
        assert!(config.enabled);
        assert_eq!(config.listen_addr.port(), 9100);
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let config = MetricsConfig::resolve(&MetricsSettings::default(), |_| None);
        assert!(!config.enabled);
        assert_eq!(config.listen_addr.port(), DEFAULT_METRICS_PORT);
        assert!(install_prometheus(&config).unwrap().is_none());
    }
}
