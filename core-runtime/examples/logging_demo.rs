//! Logging setup for an SDK host.
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_transport=trace"
//! ```

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{
    init_logging, mask_credential, redact_if_sensitive, LogFormat, LoggingConfig,
};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Prints what the host would receive over its own log channel.
struct HostSink;

#[async_trait]
impl LoggerSink for HostSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        println!("[host] {:?} {} {:?}", entry.level, entry.message, entry.fields);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some(_) => LogFormat::Pretty,
        None => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(HostSink));
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(e) = init_logging(config) {
        eprintln!("{}", e);
        return;
    }

    let key = "key_live_hkDytPACtipny3N9XmnbZlapBDdj4WIL";
    info!(credential = %mask_credential(key), "Initializing session");

    send_sms("+15555550100").await;

    // Sink fields are redacted automatically; console output is not.
    warn!(phone = "+15555550100", "Forwarded to the host sink redacted");
}

#[instrument(skip(phone))]
async fn send_sms(phone: &str) {
    debug!(phone = %redact_if_sensitive("phone", phone), "Sending SMS link");
    for attempt in 1..=3 {
        debug!(attempt, endpoint = "/v1/url", "Sending request");
    }
    info!("SMS link sent");
}
