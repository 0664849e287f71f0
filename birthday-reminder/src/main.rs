use birthday_reminder::config::{DEFAULT_CONFIG_PATH, ReminderConfig};
use birthday_reminder::module::mailer::SmtpMailer;
use birthday_reminder::module::matcher::ReferenceDate;
use birthday_reminder::module::roster::RosterParser;
use birthday_reminder::service::ReminderService;

use anyhow::Result;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load configuration
    let config_path = std::env::var("BIRTHDAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = ReminderConfig::load(&config_path)?;

    // Initialize logging
    let _logging_guard = birthday_reminder::logging::init_logging(
        &config.log_dir,
        "birthday-reminder",
        &config.log_level,
    );

    tracing::info!("=== 生日提醒系统启动 ===");

    // Single clock read for the whole run
    let reference = ReferenceDate::now();

    tracing::info!("读取生日列表 {} ...", config.roster_path);
    let roster = RosterParser::new()?.parse_file(&config.roster_path).await?;
    if roster.is_empty() {
        tracing::warn!("没有找到有效的生日记录");
    } else {
        tracing::info!("成功加载 {} 条生日记录", roster.len());
    }

    let service = ReminderService::new(&config, SmtpMailer::new(config.smtp.clone()));
    let report = service.run(&roster, &reference).await;

    tracing::info!("程序运行时间: {}", reference.formatted());

    if report.is_success() {
        tracing::info!("=== 程序运行完成 ===");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            "{} of {} deliveries failed",
            report.failed_deliveries(),
            report.deliveries.len()
        );
        Ok(ExitCode::FAILURE)
    }
}
