//! Prometheus rendering of the client counters
//!
//! The console is a one-shot process, so instead of serving `/metrics` it
//! installs the recorder on request and prints the exposition text to stderr
//! on exit. The counters themselves are emitted by `admin_client::metrics`.

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Write the current exposition text to stderr.
pub fn report(handle: &PrometheusHandle) {
    eprint!("{}", handle.render());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_counters_render_through_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            admin_client::metrics::record_request("200");
            admin_client::metrics::record_request("401");
            admin_client::metrics::record_refresh("success");
            admin_client::metrics::record_session_ended();
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"admin_api_requests_total{status="200"} 1"#), "{rendered}");
        assert!(rendered.contains(r#"admin_api_requests_total{status="401"} 1"#), "{rendered}");
        assert!(rendered.contains(r#"admin_token_refresh_total{outcome="success"} 1"#), "{rendered}");
        assert!(rendered.contains("admin_session_ended_total 1"), "{rendered}");
    }
}
