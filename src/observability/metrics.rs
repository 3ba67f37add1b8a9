//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default port of the scrape endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the metrics exporter.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings.
    #[must_use]
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        let port = settings.port.unwrap_or(DEFAULT_METRICS_PORT);
        Self {
            enabled: settings.enabled.unwrap_or(false),
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self::from_settings(&MetricsSettings::default())
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// Returns false without touching the global recorder when metrics are
/// disabled. The exporter runs on its own background thread.
///
/// # Errors
///
/// Returns [`Error::Config`] if the listener cannot bind or a recorder is
/// already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<bool> {
    if !config.enabled {
        return Ok(false);
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| Error::config("metrics_recorder_install", e))?;

    tracing::info!(listen_addr = %config.listen_addr, "prometheus exporter listening");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry_smoke() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            crate::storage::record_operation_metrics(
                "memory",
                "create_user",
                std::time::Instant::now(),
                "success",
            );
        });

        let rendered = handle.render();
        assert!(rendered.contains("storage_operations_total"));
        assert!(rendered.contains("operation=\"create_user\""));
    }

    #[test]
    fn test_from_settings_defaults() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.listen_addr.port(), DEFAULT_METRICS_PORT);

        let config = MetricsConfig::from_settings(&MetricsSettings {
            enabled: Some(true),
            port: Some(9500),
        });
        assert!(config.enabled);
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:9500");
    }

    #[test]
    fn test_disabled_installs_nothing() {
        assert!(!install_prometheus(&MetricsConfig::default()).unwrap());
    }
}
