// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::{
    InMemoryMetricExporter, SdkMeterProvider,
    data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics, ScopeMetrics},
};

/// Test helper for collecting and asserting on `OTel` metrics.
#[derive(Debug)]
pub struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl Default for MetricTester {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricTester {
    #[must_use]
    pub fn new() -> Self {
        let in_memory = InMemoryMetricExporter::default();

        Self {
            exporter: in_memory.clone(),
            provider: SdkMeterProvider::builder().with_periodic_exporter(in_memory).build(),
        }
    }

    #[must_use]
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    /// Flushes the provider and returns the attributes of every exported data point.
    ///
    /// # Panics
    ///
    /// Panics if the provider cannot be flushed.
    #[must_use]
    pub fn collect_attributes(&self) -> Vec<KeyValue> {
        self.provider.force_flush().expect("in-memory provider flushes");
        self.exporter
            .get_finished_metrics()
            .expect("in-memory exporter is readable")
            .iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(ScopeMetrics::metrics)
            .flat_map(collect_attributes_for_metric)
            .collect()
    }

    /// Returns the latest total of the `u64` counter called `name`, across all attribute sets.
    ///
    /// # Panics
    ///
    /// Panics if the provider cannot be flushed.
    #[must_use]
    pub fn counter_total(&self, name: &str) -> u64 {
        self.provider.force_flush().expect("in-memory provider flushes");
        let exported = self.exporter.get_finished_metrics().expect("in-memory exporter is readable");
        exported
            .iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(ScopeMetrics::metrics)
            .filter(|metric| metric.name() == name)
            .last()
            .map_or(0, |metric| match metric.data() {
                AggregatedMetrics::U64(MetricData::Sum(sum)) => sum.data_points().map(|point| point.value()).sum(),
                _ => 0,
            })
    }

    /// Asserts that every attribute in `key_values` was recorded on some data point.
    ///
    /// # Panics
    ///
    /// Panics if an attribute is missing.
    pub fn assert_attributes_contain(&self, key_values: &[KeyValue]) {
        let attributes = self.collect_attributes();

        for attr in key_values {
            assert!(
                attributes.contains(attr),
                "attribute {attr:?} not found in collected attributes: {attributes:?}"
            );
        }
    }
}

fn collect_attributes_for_metric(metric: &Metric) -> Vec<KeyValue> {
    match metric.data() {
        AggregatedMetrics::F64(data) => match data {
            MetricData::Gauge(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::Sum(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::Histogram(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::ExponentialHistogram(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
        },
        AggregatedMetrics::U64(data) => match data {
            MetricData::Gauge(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::Sum(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::Histogram(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::ExponentialHistogram(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
        },
        AggregatedMetrics::I64(data) => match data {
            MetricData::Gauge(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::Sum(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::Histogram(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
            MetricData::ExponentialHistogram(data) => data.data_points().flat_map(|v| v.attributes().cloned()).collect(),
        },
    }
}
