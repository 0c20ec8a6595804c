//! Prometheus 指标模块
//!
//! 基于 metrics crate 记录通知处理指标，由 metrics-exporter-prometheus
//! 在独立 HTTP 端口暴露供 Prometheus 抓取。未安装 recorder 时记录操作为空操作。

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// 安装 Prometheus recorder 并启动指标 HTTP 监听
pub fn init(service_name: &str, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service_name)
        .install()?;

    describe_metrics();
    info!(%addr, "Metrics exporter listening");

    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!(
        "notification_records_created_total",
        "Total number of notification records created"
    );
    metrics::describe_counter!(
        "notification_deliveries_total",
        "Total number of per-recipient delivery attempts"
    );
    metrics::describe_counter!(
        "notification_status_sync_updates_total",
        "Total number of records whose published flag was synchronized"
    );
    metrics::describe_counter!(
        "notification_events_skipped_total",
        "Total number of lifecycle events that produced no notification"
    );
}

/// 记录通知记录创建
#[inline]
pub fn record_created(template: &str) {
    metrics::counter!(
        "notification_records_created_total",
        "template" => template.to_string()
    )
    .increment(1);
}

/// 记录单个收件人的投递结果（success / skipped / failed）
#[inline]
pub fn record_delivery(outcome: &'static str) {
    metrics::counter!("notification_deliveries_total", "outcome" => outcome).increment(1);
}

/// 记录状态同步更新的记录数
#[inline]
pub fn record_status_sync(updated: usize) {
    metrics::counter!("notification_status_sync_updates_total").increment(updated as u64);
}

/// 记录被跳过的事件
#[inline]
pub fn record_skipped(reason: &'static str) {
    metrics::counter!("notification_events_skipped_total", "reason" => reason).increment(1);
}
