//! A minimal IRC server that registers one client and records its lines.

use std::time::Duration;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

pub struct FakeIrcServer {
    listener: TcpListener,
}

/// One accepted client connection.
pub struct FakeSession {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl FakeIrcServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    /// Accept the next client and complete its registration with `001`.
    pub async fn accept_registered(&self) -> anyhow::Result<FakeSession> {
        let (socket, _) = timeout(Duration::from_secs(10), self.listener.accept())
            .await
            .context("no client connected")??;
        let (read, writer) = socket.into_split();
        let mut session = FakeSession {
            lines: BufReader::new(read).lines(),
            writer,
        };
        let mut nick = None;
        while nick.is_none() {
            let line = session.expect(|line| line.starts_with("NICK ")).await?;
            nick = line.strip_prefix("NICK ").map(str::to_string);
        }
        session.expect(|line| line.starts_with("USER ")).await?;
        let nick = nick.unwrap_or_default();
        session
            .send(&format!(":irc.test 001 {nick} :Welcome to the test network"))
            .await?;
        Ok(session)
    }
}

impl FakeSession {
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        Ok(())
    }

    /// Like [`FakeSession::expect`], but `None` if nothing matches within
    /// `window`.
    pub async fn next_matching_within<F>(
        &mut self,
        pred: F,
        window: Duration,
    ) -> anyhow::Result<Option<String>>
    where
        F: Fn(&str) -> bool,
    {
        let result = timeout(window, async {
            while let Some(line) = self.lines.next_line().await? {
                if pred(&line) {
                    return Ok(Some(line));
                }
            }
            Ok(None)
        })
        .await;
        result.unwrap_or(Ok(None))
    }

    /// Read lines until one satisfies `pred`, failing after five seconds.
    pub async fn expect<F>(&mut self, pred: F) -> anyhow::Result<String>
    where
        F: Fn(&str) -> bool,
    {
        let result = timeout(Duration::from_secs(5), async {
            while let Some(line) = self.lines.next_line().await? {
                if pred(&line) {
                    return Ok(line);
                }
            }
            bail!("client disconnected")
        })
        .await;
        match result {
            Ok(line) => line,
            Err(_) => bail!("timed out waiting for line"),
        }
    }
}
