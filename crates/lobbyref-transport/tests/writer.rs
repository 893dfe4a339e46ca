//! Integration tests for the rate-limited writer.
//!
//! Uses Tokio's paused clock so pacing can be asserted exactly; the clock
//! auto-advances whenever every task is waiting on a timer.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use lobbyref_transport::{spawn_writer, Outbox, TransportError, WriterConfig};
use tokio::io::{AsyncBufReadExt, AsyncWrite, BufReader, DuplexStream};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

/// Reads lines from the far end of the duplex, stamping each with the
/// (paused) clock time at which it arrived.
fn spawn_collector(
    far_end: DuplexStream,
) -> tokio::task::JoinHandle<Vec<(String, Instant)>> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(far_end).lines();
        let mut out = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            out.push((line, Instant::now()));
        }
        out
    })
}

fn queue(outbox: &Outbox, n: usize) {
    for i in 0..n {
        outbox.send_line(&format!("PRIVMSG #mp_1 :line {i}")).unwrap();
    }
}

/// A sink whose every write fails.
struct BrokenSink;

impl AsyncWrite for BrokenSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// =========================================================================
// WriterConfig
// =========================================================================

#[test]
fn test_interval_is_inverse_of_rate() {
    assert_eq!(WriterConfig::with_rate(2.0).interval(), Duration::from_millis(500));
    assert_eq!(WriterConfig::with_rate(0.5).interval(), Duration::from_secs(2));
}

#[test]
fn test_validated_replaces_bad_rates() {
    assert_eq!(WriterConfig::with_rate(0.0).validated(), WriterConfig::default());
    assert_eq!(WriterConfig::with_rate(-3.0).validated(), WriterConfig::default());
    assert_eq!(
        WriterConfig::with_rate(f64::NAN).validated(),
        WriterConfig::default()
    );
    assert_eq!(WriterConfig::with_rate(4.0).validated().rate_limit, 4.0);
}

// =========================================================================
// Pacing and ordering
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_n_lines_take_at_least_n_minus_one_intervals() {
    let (near, far) = tokio::io::duplex(64 * 1024);
    let collector = spawn_collector(far);
    let config = WriterConfig::with_rate(2.0);
    let (outbox, task) = spawn_writer(near, config);

    let start = Instant::now();
    queue(&outbox, 5);
    let written = task.finish().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(written, 5);
    assert!(
        elapsed >= config.interval() * 4,
        "5 lines finished after {elapsed:?}, expected >= 2s"
    );

    let lines = collector.await.unwrap();
    let texts: Vec<_> = lines.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "PRIVMSG #mp_1 :line 0",
            "PRIVMSG #mp_1 :line 1",
            "PRIVMSG #mp_1 :line 2",
            "PRIVMSG #mp_1 :line 3",
            "PRIVMSG #mp_1 :line 4",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_lines_are_spaced_by_interval() {
    let (near, far) = tokio::io::duplex(64 * 1024);
    let collector = spawn_collector(far);
    let config = WriterConfig::with_rate(4.0);
    let (outbox, task) = spawn_writer(near, config);

    queue(&outbox, 6);
    task.finish().await.unwrap();

    let lines = collector.await.unwrap();
    assert_eq!(lines.len(), 6);
    for pair in lines.windows(2) {
        let gap = pair[1].1 - pair[0].1;
        assert!(gap >= config.interval(), "gap {gap:?} shorter than interval");
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_line_is_written_immediately() {
    let (near, far) = tokio::io::duplex(1024);
    let collector = spawn_collector(far);
    let (outbox, task) = spawn_writer(near, WriterConfig::with_rate(0.5));

    let start = Instant::now();
    outbox.send_line("JOIN #mp_1").unwrap();
    task.finish().await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    let lines = collector.await.unwrap();
    assert_eq!(lines[0].0, "JOIN #mp_1");
}

#[tokio::test(start_paused = true)]
async fn test_idle_period_does_not_allow_a_burst() {
    let (near, far) = tokio::io::duplex(1024);
    let collector = spawn_collector(far);
    let config = WriterConfig::with_rate(1.0);
    let (outbox, task) = spawn_writer(near, config);

    outbox.send_line("first").unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    outbox.send_line("second").unwrap();
    outbox.send_line("third").unwrap();
    task.finish().await.unwrap();

    let lines = collector.await.unwrap();
    assert_eq!(lines.len(), 3);
    let gap = lines[2].1 - lines[1].1;
    assert!(gap >= config.interval(), "burst after idle: gap {gap:?}");
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_send_after_finish_is_rejected() {
    let (near, _far) = tokio::io::duplex(1024);
    let (outbox, task) = spawn_writer(near, WriterConfig::default());

    task.finish().await.unwrap();

    assert!(outbox.is_closed());
    let err = outbox.send_line("late").unwrap_err();
    assert!(matches!(err, TransportError::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn test_abort_discards_pending_lines() {
    let (near, far) = tokio::io::duplex(64 * 1024);
    let collector = spawn_collector(far);
    let (outbox, task) = spawn_writer(near, WriterConfig::with_rate(1.0));

    queue(&outbox, 10);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    task.abort().await;

    let lines = collector.await.unwrap();
    assert!(!lines.is_empty());
    assert!(lines.len() < 10, "abort should not drain ({} written)", lines.len());
    assert_eq!(lines[0].0, "PRIVMSG #mp_1 :line 0");
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_outbox_ends_the_task() {
    let (near, far) = tokio::io::duplex(1024);
    let collector = spawn_collector(far);
    let (outbox, task) = spawn_writer(near, WriterConfig::with_rate(10.0));

    queue(&outbox, 2);
    drop(outbox);

    let written = task.finish().await.unwrap();
    assert_eq!(written, 2);
    assert_eq!(collector.await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_write_error_is_reported_by_finish() {
    let (outbox, task) = spawn_writer(BrokenSink, WriterConfig::default());
    outbox.send_line("PRIVMSG #mp_1 :hello").unwrap();

    let err = task.finish().await.unwrap_err();
    assert!(matches!(err, TransportError::SendFailed(_)));
}

// =========================================================================
// Detached outbox
// =========================================================================

#[tokio::test]
async fn test_detached_outbox_yields_lines_without_terminator() {
    let (outbox, mut rx) = Outbox::detached();
    outbox.send_line("PRIVMSG #mp_1 :!mp start").unwrap();
    outbox.send(b"PONG :cho.ppy.sh\r\n".to_vec()).unwrap();

    assert_eq!(rx.recv_line().await.as_deref(), Some("PRIVMSG #mp_1 :!mp start"));
    assert_eq!(rx.drain_lines(), vec!["PONG :cho.ppy.sh".to_string()]);

    drop(outbox);
    assert_eq!(rx.recv_line().await, None);
}
