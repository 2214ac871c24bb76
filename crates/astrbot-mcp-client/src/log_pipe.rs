//! Forward a server's stderr into `tracing` and the client's error log

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Lines kept per server; older lines are dropped first
pub(crate) const MAX_ERRLOG_LINES: usize = 500;

/// Tail of the error output a server produced, shared between the stderr
/// task and the session handler
#[derive(Clone, Default)]
pub(crate) struct ErrLog {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl ErrLog {
    pub(crate) async fn push(&self, line: String) {
        let mut lines = self.lines.lock().await;
        if lines.len() == MAX_ERRLOG_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub(crate) async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.iter().cloned().collect()
    }
}

/// Spawn a task that reads `reader` line by line until EOF.
///
/// Every non-empty line is logged at `error` level tagged with `identifier`
/// and appended to `sink`.
pub(crate) fn spawn<R>(reader: R, identifier: String, sink: ErrLog) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim_end().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    error!(server = %identifier, "{}", line);
                    sink.push(line).await;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(server = %identifier, "stderr pipe closed: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_are_collected() {
        let sink = ErrLog::default();
        let input: &'static [u8] = b"first error\n\n  \r\nsecond error\r\n";
        spawn(input, "MCPServer-test".to_string(), sink.clone())
            .await
            .unwrap();

        assert_eq!(sink.lines().await, vec!["first error", "second error"]);
    }

    #[tokio::test]
    async fn test_errlog_keeps_only_the_tail() {
        let input: String = (0..MAX_ERRLOG_LINES + 20)
            .map(|i| format!("line {}\n", i))
            .collect();
        let sink = ErrLog::default();
        spawn(std::io::Cursor::new(input.into_bytes()), "MCPServer-chatty".to_string(), sink.clone())
            .await
            .unwrap();

        let lines = sink.lines().await;
        assert_eq!(lines.len(), MAX_ERRLOG_LINES);
        assert_eq!(lines.first().map(String::as_str), Some("line 20"));
        assert_eq!(
            lines.last().cloned(),
            Some(format!("line {}", MAX_ERRLOG_LINES + 19))
        );
    }
}
