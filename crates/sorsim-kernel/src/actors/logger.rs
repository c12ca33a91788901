//! The logger actor: drains the log channel into the log file.

use sorsim_protocol::SimLogRecord;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::channel::KeyedChannel;

/// Consumes every record on the log channel with no key filter, appending
/// one formatted line per record. Terminates on the `END` sentinel or when
/// the channel is closed and drained.
pub struct LoggerActor {
    chan: KeyedChannel<SimLogRecord>,
    file: File,
}

impl LoggerActor {
    /// The file is opened by the director during bootstrap so that an
    /// unwritable log path fails the run before any actor is spawned.
    pub fn new(chan: KeyedChannel<SimLogRecord>, file: File) -> LoggerActor {
        LoggerActor { chan, file }
    }

    pub async fn run(self) {
        let mut out = BufWriter::new(self.file);

        loop {
            let record = match self.chan.recv_at_most(u32::MAX).await {
                Ok((_key, record)) => record,
                Err(_closed) => break,
            };
            if record.is_end_sentinel() {
                break;
            }

            let line = format!("{}\n", record);
            if let Err(error) = out.write_all(line.as_bytes()).await {
                tracing::error!(%error, "log write failed");
            }
        }

        if let Err(error) = out.flush().await {
            tracing::error!(%error, "log flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorsim_protocol::{ActorId, Role, LOG_END_SENTINEL};

    fn record(text: &str) -> SimLogRecord {
        SimLogRecord {
            sim_minute: 1,
            source: ActorId::from_u64(9),
            metrics: None,
            role: Role::Director,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn writes_lines_until_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let chan = KeyedChannel::bounded(16);
        chan.try_send(1, record("first line")).unwrap();
        chan.try_send(1, record("second line")).unwrap();
        chan.try_send(1, record(LOG_END_SENTINEL)).unwrap();
        chan.try_send(1, record("after the end")).unwrap();

        let file = File::create(&path).await.unwrap();
        LoggerActor::new(chan, file).run().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first line"));
        assert!(lines[1].ends_with("second line"));
    }

    #[tokio::test]
    async fn stops_when_channel_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let chan = KeyedChannel::bounded(16);
        chan.try_send(1, record("only line")).unwrap();
        chan.close();

        let file = File::create(&path).await.unwrap();
        LoggerActor::new(chan, file).run().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
