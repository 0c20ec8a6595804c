//! 内容通知服务
//!
//! 从标准输入读取逐行 JSON 的生命周期事件，生成并投递内容通知。

use std::sync::Arc;

use notify_shared::config::AppConfig;
use notify_shared::observability;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{error, info};

use content_notifier::consumer::EventConsumer;
use content_notifier::delivery::{EmailDelivery, LogTransport};
use content_notifier::directory::RecipientResolver;
use content_notifier::repository::{MemoryEntityStore, MemoryRecordStore, MemoryUserDirectory};
use content_notifier::{ChangeClassifier, ContentNotifier, FanoutDispatcher, StatusSynchronizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("content-notifier")?;
    observability::init(&config.service_name, &config.observability)?;

    info!(
        environment = %config.environment,
        tracked_bundles = ?config.notification.tracked_bundles,
        "Starting content-notifier..."
    );

    let records = Arc::new(MemoryRecordStore::new());
    let entities = Arc::new(MemoryEntityStore::new());
    let directory = Arc::new(MemoryUserDirectory::from_config(&config.directory));

    let delivery = EmailDelivery::with_defaults(
        &config.mail,
        directory.clone(),
        Arc::new(LogTransport),
    )?;

    let classifier = ChangeClassifier::new(
        config.notification.tracked_bundles.clone(),
        Arc::new(config.notification.clone()),
        entities.clone(),
    );
    let dispatcher = FanoutDispatcher::new(
        records.clone(),
        RecipientResolver::new(directory, config.notification.reserved_user_ids.clone()),
        Arc::new(delivery),
    );
    let synchronizer = StatusSynchronizer::new(records.clone());

    let notifier = Arc::new(ContentNotifier::new(classifier, dispatcher, synchronizer));
    let consumer = EventConsumer::new(notifier, entities);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("收到 Ctrl-C，准备关闭"),
            Err(e) => error!(error = %e, "监听关闭信号失败"),
        }
        let _ = shutdown_tx.send(true);
    });

    let stats = consumer
        .run(BufReader::new(tokio::io::stdin()), shutdown_rx)
        .await?;

    info!(
        processed = stats.processed,
        failed = stats.failed,
        records = records.count(),
        "content-notifier stopped"
    );

    Ok(())
}
