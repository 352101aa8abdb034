use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt};

/// Install the global subscriber: env filter (falling back to `log_level`),
/// JSON log lines and, when `otlp_endpoint` is set, span export over OTLP.
pub fn init_tracing(service_name: &str, log_level: &str, otlp_endpoint: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let telemetry = otlp_endpoint.and_then(|endpoint| otlp_layer(service_name, endpoint));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_target(true),
        )
        .init();
}

/// OpenTelemetry layer exporting to `endpoint`. Export problems only cost
/// traces, so a failed setup is reported and the service keeps running.
fn otlp_layer<S>(
    service_name: &str,
    endpoint: &str,
) -> Option<tracing_opentelemetry::OpenTelemetryLayer<S, sdktrace::Tracer>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);
    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.to_string(),
    )]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(sdktrace::config().with_resource(resource))
        .install_batch(runtime::Tokio)
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer))
        .map_err(|e| {
            eprintln!("OTLP export to '{endpoint}' disabled for {service_name}: {e}");
        })
        .ok()
}
