///! One evaluation pass: match today's birthdays and send the reminder.

use tracing::{debug, error, info};

use crate::config::{Recipient, ReminderConfig};
use crate::module::age::age_or_unknown;
use crate::module::mailer::{DeliveryError, EmailSender};
use crate::module::matcher::{ReferenceDate, todays_birthdays};
use crate::module::renderer::{MatchedBirthday, Notification, NotificationRenderer};
use crate::module::roster::Roster;

/// Result of sending to one recipient
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub recipient: Recipient,
    pub result: Result<(), DeliveryError>,
}

/// What happened during one run
#[derive(Debug, Default)]
pub struct RunReport {
    pub total_records: usize,
    pub matched: Vec<MatchedBirthday>,
    pub notification: Option<Notification>,
    pub deliveries: Vec<DeliveryOutcome>,
}

impl RunReport {
    /// False when any attempted delivery failed
    pub fn is_success(&self) -> bool {
        self.deliveries.iter().all(|d| d.result.is_ok())
    }

    pub fn failed_deliveries(&self) -> usize {
        self.deliveries.iter().filter(|d| d.result.is_err()).count()
    }
}

pub struct ReminderService<S: EmailSender> {
    renderer: NotificationRenderer,
    recipients: Vec<Recipient>,
    sender: S,
}

impl<S: EmailSender> ReminderService<S> {
    pub fn new(config: &ReminderConfig, sender: S) -> Self {
        Self {
            renderer: NotificationRenderer::new(&config.notification),
            recipients: config.recipients(),
            sender,
        }
    }

    /// Collect today's birthdays with their ages, in roster order.
    pub fn collect_matches(&self, roster: &Roster, reference: &ReferenceDate) -> Vec<MatchedBirthday> {
        let matched: Vec<MatchedBirthday> = todays_birthdays(&roster.records, reference)
            .into_iter()
            .map(|record| MatchedBirthday {
                record: record.clone(),
                age: age_or_unknown(record, reference),
            })
            .collect();

        for m in &matched {
            info!("今天是 {} 的生日!", m.label());
        }
        debug!("{} of {} records are not today", roster.len() - matched.len(), roster.len());

        matched
    }

    pub async fn run(&self, roster: &Roster, reference: &ReferenceDate) -> RunReport {
        info!(
            "检查生日是否是今天... ({} records, reference {})",
            roster.len(),
            reference.formatted()
        );

        let matched = self.collect_matches(roster, reference);
        let mut report = RunReport {
            total_records: roster.len(),
            ..RunReport::default()
        };

        let Some(notification) = self.renderer.render(&matched, reference) else {
            info!("今日生日总结: 今天没有人过生日。");
            return report;
        };

        info!("今日生日总结 ({}人):", matched.len());
        for line in self.renderer.summary_lines(&matched) {
            info!("  {}", line);
        }

        // 依次发送，一个失败不影响下一个
        for recipient in &self.recipients {
            let result = match recipient.address() {
                Some(address) => self.sender.send(&notification, address).await,
                None => Err(DeliveryError::NoRecipient),
            };

            match &result {
                Ok(()) => info!(
                    "生日提醒邮件已发送给{} {}，发送时间: {}",
                    recipient.role(),
                    recipient.address().unwrap_or_default(),
                    reference.formatted()
                ),
                Err(e) => error!("邮件发送失败 ({}): {}", recipient.role(), e),
            }

            report.deliveries.push(DeliveryOutcome {
                recipient: recipient.clone(),
                result,
            });
        }

        report.matched = matched;
        report.notification = Some(notification);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::roster::RosterParser;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every send; fails for addresses in `fail_for`.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail_for: Vec<String>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, notification: &Notification, to: &str) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), notification.subject.clone()));
            if self.fail_for.iter().any(|f| f == to) {
                Err(DeliveryError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn config() -> ReminderConfig {
        let mut config = ReminderConfig::default();
        config.smtp.username = Some("bot@qq.com".to_string());
        config.notification.admin_email = Some("admin@qq.com".to_string());
        config
    }

    fn roster(content: &str) -> Roster {
        RosterParser::new().unwrap().parse_str(content)
    }

    #[tokio::test]
    async fn test_single_match_sends_to_member_and_admin() {
        let service = ReminderService::new(&config(), RecordingSender::default());
        let reference = ReferenceDate::from_ymd(2024, 3, 20).unwrap();
        let report = service
            .run(&roster("Bob-1990-3-20-a\nAlice-3-15-a\n"), &reference)
            .await;

        assert_eq!(report.total_records, 2);
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].age, Some(34));
        assert!(report.is_success());

        let sent = service.sender.sent.lock().unwrap();
        let to: Vec<&str> = sent.iter().map(|(to, _)| to.as_str()).collect();
        assert_eq!(to, vec!["bot@qq.com", "admin@qq.com"]);
        assert_eq!(sent[0].1, "生日提醒: 今天是Bob (公历)的生日");
    }

    #[tokio::test]
    async fn test_no_match_sends_nothing() {
        let service = ReminderService::new(&config(), RecordingSender::default());
        let reference = ReferenceDate::from_ymd(2024, 3, 16).unwrap();
        let report = service.run(&roster("Alice-3-15-a\n"), &reference).await;

        assert!(report.matched.is_empty());
        assert!(report.notification.is_none());
        assert!(report.deliveries.is_empty());
        assert!(report.is_success());
        assert!(service.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_member_delivery_still_tries_admin() {
        let sender = RecordingSender {
            fail_for: vec!["bot@qq.com".to_string()],
            ..RecordingSender::default()
        };
        let service = ReminderService::new(&config(), sender);
        let reference = ReferenceDate::from_ymd(2024, 3, 15).unwrap();
        let report = service
            .run(&roster("Alice-3-15-a\n张三-3-15-b\nBob-2000-3-15-a-财务部\n"), &reference)
            .await;

        // 2024-03-15 is lunar 2-6, so only the solar records match
        assert_eq!(report.matched.len(), 2);
        assert_eq!(report.deliveries.len(), 2);
        assert_eq!(report.failed_deliveries(), 1);
        assert!(!report.is_success());
        assert_eq!(service.sender.sent.lock().unwrap().len(), 2);
        assert_eq!(
            report.notification.unwrap().subject,
            "生日提醒: 今天有多位成员的生日"
        );
    }

    #[tokio::test]
    async fn test_missing_recipient_is_a_failure() {
        let service = ReminderService::new(&ReminderConfig::default(), RecordingSender::default());
        let reference = ReferenceDate::from_ymd(2024, 3, 15).unwrap();
        let report = service.run(&roster("Alice-3-15-a\n"), &reference).await;

        assert_eq!(report.deliveries.len(), 1);
        assert!(matches!(report.deliveries[0].result, Err(DeliveryError::NoRecipient)));
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_unknown_lunar_age_still_notifies() {
        let service = ReminderService::new(&config(), RecordingSender::default());
        // 2024-02-10 is lunar 1-1; birth year 1899 is outside the lunar table
        let reference = ReferenceDate::from_ymd(2024, 2, 10).unwrap();
        let report = service.run(&roster("Carol-1899-1-1-b\n"), &reference).await;

        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].age, None);
        assert!(report.is_success());
    }
}
