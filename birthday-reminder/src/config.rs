use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// 465 uses implicit TLS, anything else STARTTLS
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender address, defaults to `username`
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Plain,
    Html,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Default recipient, falls back to the SMTP account itself
    #[serde(default)]
    pub recipient: Option<String>,

    #[serde(default)]
    pub admin_email: Option<String>,

    /// Prefix such as "心助会" put in front of every name
    #[serde(default)]
    pub organization: Option<String>,

    #[serde(default = "default_footer")]
    pub footer: String,

    #[serde(default)]
    pub format: BodyFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_roster_path")]
    pub roster_path: String,

    #[serde(default)]
    pub smtp: SmtpConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

fn default_smtp_host() -> String {
    "smtp.qq.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_footer() -> String {
    "来自github自动任务".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_roster_path() -> String {
    "birthdays.txt".to_string()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            admin_email: None,
            organization: None,
            footer: default_footer(),
            format: BodyFormat::default(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            roster_path: default_roster_path(),
            smtp: SmtpConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl SmtpConfig {
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }
}

impl ReminderConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ReminderConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load the file when present, otherwise start from defaults, then apply
    /// environment overrides.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override credentials and recipients from `SMTP_USER`, `SMTP_PASSWORD`,
    /// `ADMIN_EMAIL` and `BIRTHDAY_RECIPIENT`. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(user) = get("SMTP_USER") {
            self.smtp.username = Some(user);
        }
        if let Some(password) = get("SMTP_PASSWORD") {
            self.smtp.password = Some(password);
        }
        if let Some(admin) = get("ADMIN_EMAIL") {
            self.notification.admin_email = Some(admin);
        }
        if let Some(recipient) = get("BIRTHDAY_RECIPIENT") {
            self.notification.recipient = Some(recipient);
        }
    }

    /// Addresses to notify, default recipient first. The admin address is
    /// skipped when it equals the default recipient.
    pub fn recipients(&self) -> Vec<Recipient> {
        let mut recipients = Vec::new();
        let primary = self
            .notification
            .recipient
            .clone()
            .or_else(|| self.smtp.username.clone());
        recipients.push(Recipient::Member(primary.clone()));

        if let Some(admin) = &self.notification.admin_email {
            if primary.as_deref() != Some(admin.as_str()) {
                recipients.push(Recipient::Admin(admin.clone()));
            }
        }
        recipients
    }
}

/// A notification target. The member address may be missing from the
/// configuration, which is reported as a failed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Member(Option<String>),
    Admin(String),
}

impl Recipient {
    pub fn address(&self) -> Option<&str> {
        match self {
            Recipient::Member(addr) => addr.as_deref(),
            Recipient::Admin(addr) => Some(addr),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Recipient::Member(_) => "成员",
            Recipient::Admin(_) => "管理员",
        }
    }
}
