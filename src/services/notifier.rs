// src/services/notifier.rs

//! Change notifications.
//!
//! The watcher only decides *that* something changed; delivery is left to a
//! [`Notifier`] backend. Delivery is fire-and-forget, nothing is reported
//! back into the pipeline beyond a log line.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::{NotifierBackend, NotifierConfig};
use crate::pipeline::QueueDiff;

/// A local notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl Notification {
    /// Notification for a changed timetable.
    ///
    /// The configured body is extended with the affected rows when the
    /// keyed diff found any.
    pub fn schedule_changed(config: &NotifierConfig, diff: &QueueDiff) -> Self {
        let rows = diff.affected_labels();
        let body = if rows.is_empty() {
            config.body.clone()
        } else {
            format!("{}\nЧерги: {}", config.body, rows.join(", "))
        };

        Self {
            title: config.title.clone(),
            body,
            icon: config.icon.clone(),
        }
    }

    /// Notification used to check that delivery works.
    pub fn test(config: &NotifierConfig) -> Self {
        Self {
            title: "🧪 Тестове сповіщення".into(),
            body: "Якщо ви бачите це повідомлення — все працює!".into(),
            icon: config.icon.clone(),
        }
    }
}

/// Delivery backend for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        log::info!(
            "NOTIFY {} | {}",
            notification.title,
            notification.body.replace('\n', " | ")
        );
        Ok(())
    }
}

/// Runs an external program such as `notify-send`.
///
/// The command is invoked as `<program> <args...> [-i <icon>] <title> <body>`
/// where `-i` is only passed to `notify-send`.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| AppError::config("notifier.command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn argv(&self, notification: &Notification) -> Vec<String> {
        let mut argv = self.args.clone();
        if self.program.ends_with("notify-send") && !notification.icon.is_empty() {
            argv.push("-i".into());
            argv.push(notification.icon.clone());
        }
        argv.push(notification.title.clone());
        argv.push(notification.body.clone());
        argv
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let status = Command::new(&self.program)
            .args(self.argv(notification))
            .status()
            .await?;

        if !status.success() {
            return Err(AppError::notify(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}

/// Build the configured backend.
pub fn create_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    Ok(match config.backend {
        NotifierBackend::Log => Arc::new(LogNotifier),
        NotifierBackend::Command => Arc::new(CommandNotifier::new(&config.command)?),
    })
}
