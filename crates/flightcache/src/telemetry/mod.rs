// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logging and optional OpenTelemetry metrics for cache operations.
//!
//! Every facade operation is reported as a `cache.event` through `tracing`, carrying the
//! cache name, the operation, what happened (the activity) and how long it took. With the
//! `metrics` feature, the same events also feed an event counter and a duration histogram.

use std::{sync::Arc, time::Duration};

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider};
use tracing::Level;

pub(crate) mod attributes;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;

/// Configuration for cache telemetry.
///
/// Caches log their operations by default. Pass a configuration to
/// [`CacheBuilder::telemetry`](crate::CacheBuilder::telemetry) to change that.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use flightcache::{Cache, TelemetryConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// // A cache that stays silent.
/// let cache = Cache::builder::<String>(Duration::from_secs(60))
///     .memory()
///     .telemetry(TelemetryConfig::new())
///     .build();
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl TelemetryConfig {
    /// Creates a configuration with logs and metrics disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables a `tracing` event for every cache operation.
    #[must_use]
    pub fn with_logs(mut self) -> Self {
        self.logs_enabled = true;
        self
    }

    /// Enables metrics collection using the provided meter provider.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(metrics::create_meter(provider));
        self
    }

    pub(crate) fn build(self) -> CacheTelemetry {
        CacheTelemetry {
            inner: Arc::new(TelemetryInner {
                logging_enabled: self.logs_enabled,
                #[cfg(any(feature = "metrics", test))]
                event_counter: self.meter.as_ref().map(metrics::create_event_counter),
                #[cfg(any(feature = "metrics", test))]
                operation_duration: self.meter.as_ref().map(metrics::create_operation_duration_histogram),
            }),
        }
    }
}

#[derive(Debug)]
struct TelemetryInner {
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    operation_duration: Option<Histogram<f64>>,
}

/// Records cache events.
#[derive(Clone, Debug)]
pub(crate) struct CacheTelemetry {
    inner: Arc<TelemetryInner>,
}

impl CacheTelemetry {
    pub(crate) fn record(&self, cache_name: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        self.record_metrics(cache_name, operation, activity, duration);

        if self.inner.logging_enabled {
            Self::emit(cache_name, operation, activity, duration);
        }
    }

    #[cfg(any(feature = "metrics", test))]
    fn record_metrics(&self, cache_name: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        use opentelemetry::KeyValue;

        if self.inner.event_counter.is_none() && self.inner.operation_duration.is_none() {
            return;
        }

        let attrs = [
            KeyValue::new(attributes::CACHE_NAME, cache_name.to_string()),
            KeyValue::new(attributes::CACHE_OPERATION_NAME, operation.as_str()),
            KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
        ];

        if let Some(counter) = &self.inner.event_counter {
            counter.add(1, &attrs);
        }
        if let (Some(duration), Some(histogram)) = (duration, &self.inner.operation_duration) {
            histogram.record(duration.as_secs_f64(), &attrs);
        }
    }

    fn emit(cache_name: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.operation = op,
                    cache.activity = act,
                    cache.duration_ns = ?duration_ns,
                    "cache.event"
                )
            };
        }

        match activity.level() {
            Level::ERROR => emit_event!(error),
            Level::WARN => emit_event!(warn),
            Level::INFO => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}

/// The facade operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Fetch,
    Set,
    Delete,
    Destroy,
}

impl CacheOperation {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Fetch => "cache.fetch",
            Self::Set => "cache.set",
            Self::Delete => "cache.delete",
            Self::Destroy => "cache.destroy",
        }
    }
}

/// What happened during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    /// The store held a value for the key.
    Hit,
    /// The store held nothing for the key.
    Miss,
    /// This caller ran the origin.
    Owner,
    /// This caller waited on another caller's origin call.
    Coalesced,
    /// A value was written to the store.
    Stored,
    /// A key was removed from the store.
    Deleted,
    /// The store was shut down and pending callers released.
    Destroyed,
    /// The origin returned an error.
    OriginError,
    /// The owning origin call was dropped before it settled.
    Abandoned,
    /// The store or codec failed.
    Error,
}

impl CacheActivity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Owner => "cache.owner",
            Self::Coalesced => "cache.coalesced",
            Self::Stored => "cache.stored",
            Self::Deleted => "cache.deleted",
            Self::Destroyed => "cache.destroyed",
            Self::OriginError => "cache.origin_error",
            Self::Abandoned => "cache.abandoned",
            Self::Error => "cache.error",
        }
    }

    pub(crate) fn level(self) -> Level {
        match self {
            Self::Hit | Self::Miss | Self::Coalesced => Level::DEBUG,
            Self::Owner | Self::Stored | Self::Deleted | Self::Destroyed => Level::INFO,
            Self::Abandoned => Level::WARN,
            Self::OriginError | Self::Error => Level::ERROR,
        }
    }
}
