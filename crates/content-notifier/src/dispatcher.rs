//! 通知扇出
//!
//! 为一次通知动作持久化一条通知记录，然后向每个符合条件的收件人单独投递。
//! 单个收件人投递失败只记录日志，不影响其余收件人。

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use notify_shared::error::Result;
use notify_shared::events::{ContentEntity, UserId};
use notify_shared::observability::metrics;

use crate::delivery::{DeliveryService, FAILED_OUTCOME, SendStatus};
use crate::directory::RecipientResolver;
use crate::models::{Action, NotificationRecord, NotifyOptions, SubscribeOptions, SubscriptionTarget};
use crate::repository::NotificationRecordStore;

/// 一次扇出的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub record_id: Uuid,
    pub recipients: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: Vec<UserId>,
}

impl DispatchReport {
    fn new(record_id: Uuid, recipients: usize) -> Self {
        Self {
            record_id,
            recipients,
            sent: 0,
            skipped: 0,
            failed: Vec::new(),
        }
    }

    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 扇出调度器
pub struct FanoutDispatcher {
    records: Arc<dyn NotificationRecordStore>,
    recipients: RecipientResolver,
    delivery: Arc<dyn DeliveryService>,
    options: NotifyOptions,
}

impl FanoutDispatcher {
    pub fn new(
        records: Arc<dyn NotificationRecordStore>,
        recipients: RecipientResolver,
        delivery: Arc<dyn DeliveryService>,
    ) -> Self {
        Self {
            records,
            recipients,
            delivery,
            options: NotifyOptions::default(),
        }
    }

    /// 持久化记录并向所有收件人投递
    ///
    /// 记录持久化失败时直接返回错误，不会进行任何投递。
    #[instrument(skip_all, fields(template = action.template.as_str(), source = ?action.source))]
    pub async fn dispatch(&self, action: &Action, context: &ContentEntity) -> Result<DispatchReport> {
        let record = NotificationRecord::from_action(action);
        self.records.create(&record).await?;
        metrics::record_created(record.template.as_str());

        let recipients = self.recipients.resolve().await?;
        let mut report = DispatchReport::new(record.id, recipients.len());

        // 每个收件人单独调用投递服务，逐个发送
        for uid in recipients {
            let subscribe = SubscribeOptions::single(SubscriptionTarget::email_only(uid));
            match self
                .delivery
                .send(context, &record, &self.options, &subscribe)
                .await
            {
                Ok(receipts) => {
                    for receipt in receipts {
                        match receipt.status {
                            SendStatus::Sent => report.sent += 1,
                            SendStatus::Skipped => report.skipped += 1,
                        }
                        metrics::record_delivery(receipt.status.outcome());
                    }
                }
                Err(e) => {
                    warn!(
                        record_id = %record.id,
                        uid,
                        error = %e,
                        retryable = e.is_retryable(),
                        "收件人投递失败"
                    );
                    metrics::record_delivery(FAILED_OUTCOME);
                    report.failed.push(uid);
                }
            }
        }

        if report.all_delivered() {
            info!(
                record_id = %record.id,
                recipients = report.recipients,
                sent = report.sent,
                skipped = report.skipped,
                "通知扇出完成"
            );
        } else {
            warn!(
                record_id = %record.id,
                recipients = report.recipients,
                sent = report.sent,
                skipped = report.skipped,
                failed = ?report.failed,
                "通知扇出完成，部分收件人投递失败"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryReceipt, EmailDelivery, MemoryTransport, MockDeliveryService};
    use crate::models::{RevisionPair, SourceRef};
    use crate::repository::{
        MemoryRecordStore, MemoryUserDirectory, MockNotificationRecordStore, MockUserDirectory,
    };
    use ::metrics::{
        Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use notify_shared::config::MailConfig;
    use notify_shared::error::NotifyError;
    use std::collections::HashMap;
    use notify_shared::events::TemplateKind;
    use notify_shared::test_utils::ContentBuilder;
    use std::sync::Mutex;

    fn action() -> Action {
        Action {
            template: TemplateKind::UpdateContent,
            source: SourceRef::Content(42),
            owner_id: 2,
            published: true,
            revisions: Some(RevisionPair::changed(5, 6)),
        }
    }

    fn directory_with(uids: Vec<UserId>) -> MockUserDirectory {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_active_user_ids()
            .returning(move || Ok(uids.clone()));
        directory
    }

    #[tokio::test]
    async fn test_dispatch_one_call_per_recipient() {
        let mut records = MockNotificationRecordStore::new();
        records
            .expect_create()
            .withf(|record| {
                record.template == TemplateKind::UpdateContent
                    && record.source == SourceRef::Content(42)
                    && record.owner_id == 2
                    && record.published
            })
            .times(1)
            .returning(|_| Ok(()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let mut delivery = MockDeliveryService::new();
        delivery
            .expect_send()
            .times(3)
            .returning(move |_, _, _, subscribe| {
                assert_eq!(subscribe.uids.len(), 1);
                let uid = *subscribe.uids.keys().next().unwrap();
                seen_clone.lock().unwrap().push(uid);
                Ok(vec![DeliveryReceipt::sent(uid, format!("mail_{uid}"))])
            });

        let dispatcher = FanoutDispatcher::new(
            Arc::new(records),
            RecipientResolver::with_default_reserved(Arc::new(directory_with(vec![1, 2, 3, 5]))),
            Arc::new(delivery),
        );

        let report = dispatcher
            .dispatch(&action(), &ContentBuilder::new(42).owner(2).build())
            .await
            .unwrap();

        assert_eq!(report.recipients, 3);
        assert_eq!(report.sent, 3);
        assert!(report.all_delivered());
        assert_eq!(*seen.lock().unwrap(), vec![2, 3, 5]);
    }

    #[tokio::test]
    async fn test_persistence_failure_prevents_delivery() {
        let mut records = MockNotificationRecordStore::new();
        records
            .expect_create()
            .times(1)
            .returning(|_| Err(NotifyError::Storage("disk full".to_string())));

        let mut directory = MockUserDirectory::new();
        directory.expect_active_user_ids().never();

        let mut delivery = MockDeliveryService::new();
        delivery.expect_send().never();

        let dispatcher = FanoutDispatcher::new(
            Arc::new(records),
            RecipientResolver::with_default_reserved(Arc::new(directory)),
            Arc::new(delivery),
        );

        let err = dispatcher
            .dispatch(&action(), &ContentBuilder::new(42).build())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_ERROR");
    }

    #[tokio::test]
    async fn test_failed_recipient_does_not_block_others() {
        let mut records = MockNotificationRecordStore::new();
        records.expect_create().returning(|_| Ok(()));

        let mut delivery = MockDeliveryService::new();
        delivery
            .expect_send()
            .times(3)
            .returning(|_, _, _, subscribe| {
                let uid = *subscribe.uids.keys().next().unwrap();
                if uid == 3 {
                    Err(NotifyError::Delivery {
                        recipient: uid,
                        reason: "mailbox unavailable".to_string(),
                    })
                } else {
                    Ok(vec![DeliveryReceipt::sent(uid, format!("mail_{uid}"))])
                }
            });

        let dispatcher = FanoutDispatcher::new(
            Arc::new(records),
            RecipientResolver::with_default_reserved(Arc::new(directory_with(vec![2, 3, 4]))),
            Arc::new(delivery),
        );

        let report = dispatcher
            .dispatch(&action(), &ContentBuilder::new(42).build())
            .await
            .unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, vec![3]);
        assert!(!report.all_delivered());
    }

    #[tokio::test]
    async fn test_no_recipients_still_persists_record() {
        let mut records = MockNotificationRecordStore::new();
        records.expect_create().times(1).returning(|_| Ok(()));

        let mut delivery = MockDeliveryService::new();
        delivery.expect_send().never();

        let dispatcher = FanoutDispatcher::new(
            Arc::new(records),
            RecipientResolver::with_default_reserved(Arc::new(directory_with(vec![0, 1]))),
            Arc::new(delivery),
        );

        let report = dispatcher
            .dispatch(&action(), &ContentBuilder::new(42).build())
            .await
            .unwrap();

        assert_eq!(report.recipients, 0);
        assert_eq!(report.sent, 0);
    }

    /// 只统计投递结果计数器的本地 recorder
    #[derive(Default)]
    struct OutcomeRecorder {
        counts: Arc<Mutex<HashMap<String, u64>>>,
    }

    struct OutcomeCounter {
        outcome: String,
        counts: Arc<Mutex<HashMap<String, u64>>>,
    }

    impl CounterFn for OutcomeCounter {
        fn increment(&self, value: u64) {
            *self.counts.lock().unwrap().entry(self.outcome.clone()).or_default() += value;
        }

        fn absolute(&self, value: u64) {
            self.counts.lock().unwrap().insert(self.outcome.clone(), value);
        }
    }

    impl OutcomeRecorder {
        fn count(&self, outcome: &str) -> u64 {
            self.counts.lock().unwrap().get(outcome).copied().unwrap_or(0)
        }
    }

    impl Recorder for OutcomeRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            if key.name() != "notification_deliveries_total" {
                return Counter::noop();
            }
            let outcome = key
                .labels()
                .find(|label| label.key() == "outcome")
                .map(|label| label.value().to_string())
                .unwrap_or_default();
            Counter::from_arc(Arc::new(OutcomeCounter {
                outcome,
                counts: self.counts.clone(),
            }))
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_recipient_without_email_counts_as_skipped() {
        let directory = MemoryUserDirectory::new();
        directory.add_active(2);
        directory.insert(3, None, true);

        let config = MailConfig {
            from_address: "noreply@blog.example.org".to_string(),
            base_url: "https://blog.example.org".to_string(),
            ..Default::default()
        };
        let transport = MemoryTransport::new();
        let delivery = EmailDelivery::with_defaults(
            &config,
            Arc::new(directory.clone()),
            Arc::new(transport.clone()),
        )
        .unwrap();
        let records = MemoryRecordStore::new();

        let dispatcher = FanoutDispatcher::new(
            Arc::new(records.clone()),
            RecipientResolver::with_default_reserved(Arc::new(directory)),
            Arc::new(delivery),
        );

        let recorder = OutcomeRecorder::default();
        let report = ::metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(dispatcher.dispatch(&action(), &ContentBuilder::new(42).build()))
        })
        .unwrap();

        assert_eq!(report.recipients, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.all_delivered());
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(records.count(), 1);

        assert_eq!(recorder.count("success"), 1);
        assert_eq!(recorder.count("skipped"), 1);
        assert_eq!(recorder.count(FAILED_OUTCOME), 0);
    }
}
