use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::util::env::Config;

pub type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

/// Owns the exporter pipelines for the lifetime of the process.
///
/// Without a collector endpoint only the console fmt layer is installed.
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub service_name: String,
    pub collector_url: Option<String>,
    filter: String,

    logger_provider: Option<SdkLoggerProvider>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn new(config: &Config) -> Result<Telemetry> {
        let service_name = config.service_name.clone();
        let collector_url = config.otel_exporter_otlp_endpoint.clone();

        let (logger_provider, tracer_provider) = match collector_url.as_deref() {
            Some(url) => {
                let base_resource = base_attrs(&service_name, env!("CARGO_PKG_VERSION"));
                (
                    Some(build_logger_provider(url, base_resource.clone())?),
                    Some(build_tracer_provider(url, base_resource)?),
                )
            }
            None => (None, None),
        };

        Ok(Self {
            service_name,
            collector_url,
            filter: config.log_filter.clone(),
            logger_provider,
            tracer_provider,
        })
    }

    pub fn register(self) -> Self {
        let trace_layer = self.tracer_provider.as_ref().map(|provider| {
            let tracer = provider.tracer(self.service_name.clone());
            tracing_opentelemetry::layer().with_tracer(tracer)
        });

        let log_layer = self
            .logger_provider
            .as_ref()
            .map(OpenTelemetryTracingBridge::new);

        tracing_subscriber::registry()
            .with(trace_layer)
            .with(log_layer)
            .with(EnvFilter::new(&self.filter))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .init();

        self
    }

    pub fn shutdown(self) {
        if let Some(provider) = self.logger_provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("error during logging shutdown: {e:?}");
            }
        }

        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("error during tracing shutdown: {e:?}");
            }
        }
    }
}

pub fn build_logger_provider(
    collector_url: &str,
    base_resource: Resource,
) -> Result<SdkLoggerProvider> {
    let exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Logs.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    Ok(SdkLoggerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(base_resource)
        .build())
}

pub fn build_tracer_provider(
    collector_url: &str,
    base_resource: Resource,
) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Traces.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(base_resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());

    Ok(provider)
}

fn base_attrs(name: &str, version: &'static str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", name.to_string()),
            KeyValue::new("service.version", version),
        ])
        .build()
}

enum Endpoint {
    Logs,
    Traces,
}

impl Endpoint {
    pub fn to_url(&self, collector_endpoint: &str) -> String {
        let location: &str = match self {
            Endpoint::Logs => "/v1/logs",
            Endpoint::Traces => "/v1/traces",
        };
        format!("{}{location}", collector_endpoint.trim_end_matches('/'))
    }
}
