//! 로그 피드 -- JSON 라인 스트림을 [`EntrySource`]로 노출합니다.
//!
//! # 피드
//! - [`JsonLinesSource`]: 임의의 `AsyncRead`에서 한 줄에 하나의 JSON 객체를 읽음
//! - [`JournalSource`]: `journalctl --follow --output=json` 자식 프로세스
//!
//! # 아키텍처
//! 읽기는 별도 tokio 태스크에서 수행되며, 파싱된 엔트리는
//! `tokio::mpsc` 채널로 전달됩니다. 디스패처는 채널만 소비합니다.

pub mod journal;

pub use journal::JournalSource;

use std::collections::VecDeque;
use std::time::Duration;

use ochlero_core::error::SourceError;
use ochlero_core::metrics as m;
use ochlero_core::pipeline::EntrySource;
use ochlero_core::types::JournalEntry;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 기본 채널 용량
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// 최대 라인 길이 (바이트)
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1MB

/// JSON 라인 피드
///
/// 리더 태스크가 EOF에 도달하면 채널이 닫히고,
/// 남은 엔트리를 모두 꺼낸 뒤 [`SourceError::Closed`]를 반환합니다.
pub struct JsonLinesSource {
    rx: mpsc::Receiver<JournalEntry>,
    pending: VecDeque<JournalEntry>,
    max_batch: usize,
    reader: JoinHandle<()>,
}

impl JsonLinesSource {
    /// 리더에서 엔트리를 읽는 피드를 생성합니다.
    ///
    /// 리더 태스크를 즉시 시작하므로 tokio 런타임 안에서 호출해야 합니다.
    pub fn from_reader<R>(reader: R, max_batch: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_lines(reader, tx));
        Self {
            rx,
            pending: VecDeque::new(),
            max_batch: max_batch.max(1),
            reader,
        }
    }

    /// 한 번에 꺼낼 최대 엔트리 수
    pub fn max_batch(&self) -> usize {
        self.max_batch
    }
}

impl Drop for JsonLinesSource {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl EntrySource for JsonLinesSource {
    async fn wait_ready(&mut self, timeout: Duration) -> Result<bool, SourceError> {
        if !self.pending.is_empty() {
            return Ok(true);
        }

        // recv()는 취소 안전하며, 받은 엔트리는 await 없이 즉시 pending에 보관됩니다
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(entry)) => {
                self.pending.push_back(entry);
                Ok(true)
            }
            Ok(None) => Err(SourceError::Closed),
            Err(_) => Ok(false),
        }
    }

    fn next_batch(&mut self) -> Vec<JournalEntry> {
        let mut batch = Vec::with_capacity(self.pending.len().min(self.max_batch));

        while batch.len() < self.max_batch {
            match self.pending.pop_front() {
                Some(entry) => batch.push(entry),
                None => break,
            }
        }
        while batch.len() < self.max_batch {
            match self.rx.try_recv() {
                Ok(entry) => batch.push(entry),
                Err(_) => break,
            }
        }

        batch
    }
}

/// 리더에서 라인을 읽어 채널로 전달합니다.
///
/// 잘못된 JSON 라인은 경고 로그를 남기고 건너뜁니다.
/// UTF-8이 아닌 바이트는 손실 변환합니다.
async fn read_lines<R>(reader: R, tx: mpsc::Sender<JournalEntry>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                tracing::debug!("feed reached end of stream");
                break;
            }
            Ok(_) => {
                if buf.len() > MAX_LINE_LENGTH {
                    metrics::counter!(m::FEED_MALFORMED_LINES_TOTAL).increment(1);
                    tracing::warn!(
                        length = buf.len(),
                        max = MAX_LINE_LENGTH,
                        "feed line too long, skipping"
                    );
                    continue;
                }

                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match JournalEntry::from_json_line(line) {
                    Ok(entry) => {
                        if tx.send(entry).await.is_err() {
                            tracing::debug!("feed receiver dropped, stopping reader");
                            break;
                        }
                    }
                    Err(e) => {
                        metrics::counter!(m::FEED_MALFORMED_LINES_TOTAL).increment(1);
                        tracing::warn!(error = %e, "malformed feed line, skipping");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "feed read error");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ENTRIES: &[u8] = br#"{"MESSAGE":"first","_COMM":"a"}
{"MESSAGE":"second","_COMM":"b"}
"#;

    async fn drain(source: &mut JsonLinesSource) -> Vec<JournalEntry> {
        let mut all = Vec::new();
        loop {
            match source.wait_ready(Duration::from_millis(500)).await {
                Ok(true) => all.extend(source.next_batch()),
                Ok(false) => continue,
                Err(_) => break,
            }
        }
        all
    }

    #[tokio::test]
    async fn reads_entries_then_reports_closed() {
        let mut source = JsonLinesSource::from_reader(TWO_ENTRIES, 100);
        let entries = drain(&mut source).await;
        let messages: Vec<_> = entries.iter().filter_map(JournalEntry::message).collect();
        assert_eq!(messages, vec!["first", "second"]);

        let err = source.wait_ready(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, SourceError::Closed));
    }

    #[tokio::test]
    async fn malformed_and_blank_lines_are_skipped() {
        let input: &[u8] = b"not json\n\n{\"MESSAGE\":\"ok\"}\n[1,2]\n";
        let mut source = JsonLinesSource::from_reader(input, 100);
        let entries = drain(&mut source).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message(), Some("ok"));
    }

    #[tokio::test]
    async fn last_line_without_newline_is_read() {
        let input: &[u8] = br#"{"MESSAGE":"tail"}"#;
        let mut source = JsonLinesSource::from_reader(input, 100);
        let entries = drain(&mut source).await;
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn batch_is_bounded() {
        let input: Vec<u8> = (0..10)
            .flat_map(|i| format!("{{\"MESSAGE\":\"m{i}\"}}\n").into_bytes())
            .collect();
        let mut source = JsonLinesSource::from_reader(std::io::Cursor::new(input), 3);
        let mut sizes = Vec::new();
        loop {
            match source.wait_ready(Duration::from_millis(500)).await {
                Ok(true) => sizes.push(source.next_batch().len()),
                Ok(false) => continue,
                Err(_) => break,
            }
        }
        assert!(sizes.iter().all(|&n| n <= 3));
        assert_eq!(sizes.iter().sum::<usize>(), 10);
    }

    #[tokio::test]
    async fn wait_times_out_on_idle_feed() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut source = JsonLinesSource::from_reader(reader, 10);
        let ready = source.wait_ready(Duration::from_millis(20)).await.unwrap();
        assert!(!ready);
        assert!(source.next_batch().is_empty());
    }

    #[tokio::test]
    async fn non_utf8_bytes_are_decoded_lossily() {
        let mut input = b"{\"MESSAGE\":\"caf".to_vec();
        input.push(0xE9);
        input.extend_from_slice(b"\"}\n");
        let mut source = JsonLinesSource::from_reader(std::io::Cursor::new(input), 10);
        let entries = drain(&mut source).await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message().unwrap().starts_with("caf"));
    }
}
