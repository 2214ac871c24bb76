//! Client side of the MCP session

use crate::log_pipe::ErrLog;
use rmcp::model::LoggingMessageNotificationParam;
use rmcp::service::NotificationContext;
use rmcp::{ClientHandler, RoleClient};
use std::future::Future;
use tracing::error;

/// Session handler that records `notifications/message` log messages from
/// the server in its error log
pub(crate) struct LoggingClient {
    identifier: String,
    errlog: ErrLog,
}

impl LoggingClient {
    pub(crate) fn new(identifier: String, errlog: ErrLog) -> Self {
        Self { identifier, errlog }
    }

    async fn record(&self, params: LoggingMessageNotificationParam) {
        let message = match params.data {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        };
        error!(server = %self.identifier, level = ?params.level, "{}", message);
        self.errlog.push(message).await;
    }
}

impl ClientHandler for LoggingClient {
    fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.record(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::LoggingLevel;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_messages_reach_the_errlog() {
        let errlog = ErrLog::default();
        let handler = LoggingClient::new("MCPServer-remote".to_string(), errlog.clone());

        handler
            .record(LoggingMessageNotificationParam {
                level: LoggingLevel::Error,
                logger: None,
                data: json!("database unavailable"),
            })
            .await;
        handler
            .record(LoggingMessageNotificationParam {
                level: LoggingLevel::Warning,
                logger: Some("tools".to_string()),
                data: json!({"retry": 3}),
            })
            .await;

        assert_eq!(
            errlog.lines().await,
            vec!["database unavailable".to_string(), r#"{"retry":3}"#.to_string()]
        );
    }
}
