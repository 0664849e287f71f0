///! Notification renderer
///!
///! Turns today's matches into an email subject and body, plain text or HTML.

use birthday_common::BirthdayRecord;

use super::matcher::ReferenceDate;
use crate::config::{BodyFormat, NotificationConfig};

/// A record whose birthday is today, with its age when known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedBirthday {
    pub record: BirthdayRecord,
    pub age: Option<i32>,
}

impl MatchedBirthday {
    /// `(技术部) 张三 (公历)`
    pub fn name_with_type(&self) -> String {
        let record = &self.record;
        match &record.department {
            Some(dept) => format!("({}) {} {}", dept, record.name, record.calendar.label()),
            None => format!("{} {}", record.name, record.calendar.label()),
        }
    }

    /// `，34岁`, empty when the age is unknown
    pub fn age_suffix(&self) -> String {
        self.age.map(|age| format!("，{}岁", age)).unwrap_or_default()
    }

    /// `(技术部) 张三 (公历)，34岁`
    pub fn label(&self) -> String {
        format!("{}{}", self.name_with_type(), self.age_suffix())
    }
}

/// Rendered email content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub format: BodyFormat,
}

pub struct NotificationRenderer {
    organization: Option<String>,
    footer: String,
    format: BodyFormat,
}

impl NotificationRenderer {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            organization: config
                .organization
                .clone()
                .filter(|org| !org.trim().is_empty()),
            footer: config.footer.clone(),
            format: config.format,
        }
    }

    /// `None` when nobody has a birthday today
    pub fn render(&self, matches: &[MatchedBirthday], reference: &ReferenceDate) -> Option<Notification> {
        let sent_at = reference.formatted();
        let (subject, body) = match matches {
            [] => return None,
            [single] => {
                let subject = format!("生日提醒: 今天是{}的生日", self.with_org(&single.name_with_type()));
                let body = match self.format {
                    BodyFormat::Plain => self.single_plain(single, &sent_at),
                    BodyFormat::Html => self.single_html(single, &sent_at),
                };
                (subject, body)
            }
            many => {
                let subject = "生日提醒: 今天有多位成员的生日".to_string();
                let body = match self.format {
                    BodyFormat::Plain => self.multi_plain(many, &sent_at),
                    BodyFormat::Html => self.multi_html(many, &sent_at),
                };
                (subject, body)
            }
        };

        Some(Notification {
            subject,
            body,
            format: self.format,
        })
    }

    /// One console line per match, numbered from 1
    pub fn summary_lines(&self, matches: &[MatchedBirthday]) -> Vec<String> {
        matches
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, self.with_org(&m.label())))
            .collect()
    }

    fn with_org(&self, text: &str) -> String {
        match &self.organization {
            Some(org) => format!("{}-{}", org, text),
            None => text.to_string(),
        }
    }

    fn single_plain(&self, m: &MatchedBirthday, sent_at: &str) -> String {
        format!(
            "今天是 {} 的生日，请记得祝福 TA！\n\n邮件发送时间: {}\n\n{}",
            self.with_org(&m.label()),
            sent_at,
            self.footer
        )
    }

    fn multi_plain(&self, matches: &[MatchedBirthday], sent_at: &str) -> String {
        let list = self.summary_lines(matches).join("\n");
        format!(
            "今天有多位成员的生日：\n{}\n\n请记得祝福他们！\n\n邮件发送时间: {}\n\n{}",
            list, sent_at, self.footer
        )
    }

    fn single_html(&self, m: &MatchedBirthday, sent_at: &str) -> String {
        let content = format!(
            "<p>今天是 <span class=\"highlight\">{}</span> 的生日，请记得祝福 TA！</p>",
            escape_html(&self.with_org(&m.label()))
        );
        self.html_page(&content, sent_at)
    }

    fn multi_html(&self, matches: &[MatchedBirthday], sent_at: &str) -> String {
        let items: String = matches
            .iter()
            .map(|m| format!("<li>{}</li>", escape_html(&self.with_org(&m.label()))))
            .collect();
        let content = format!(
            "<p>今天有多名成员的生日：</p>\n<ol class=\"birthday-list\">{}</ol>\n<p class=\"highlight\">请记得送上祝福哦 🎉</p>",
            items
        );
        self.html_page(&content, sent_at)
    }

    fn html_page(&self, content: &str, sent_at: &str) -> String {
        format!(
            r#"<html>
<head>
<meta charset="utf-8">
<style>
body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; }}
.container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
.header {{ background-color: #f8f9fa; padding: 15px; text-align: center; border-radius: 5px; }}
.content {{ padding: 20px; }}
.birthday-list {{ padding-left: 20px; }}
.footer {{ background-color: #f8f9fa; padding: 15px; text-align: center; font-size: 12px; color: #6c757d; }}
.highlight {{ color: #007bff; font-weight: bold; }}
</style>
</head>
<body>
<div class="container">
<div class="header"><h2>🎂 生日提醒</h2></div>
<div class="content">
{}
</div>
<div class="footer"><p>发送时间: {}<br>{}</p></div>
</div>
</body>
</html>"#,
            content,
            escape_html(sent_at),
            escape_html(&self.footer)
        )
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
