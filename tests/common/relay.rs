//! Runs the trompet binary for a test.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::sleep;

/// A running trompet process with its own configuration directory.
pub struct TestRelay {
    child: Child,
    port: u16,
    dir: TempDir,
}

/// Path of the binary under test.
pub fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_trompet"))
}

/// A free local port for the HTTP ingress.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

impl TestRelay {
    /// Start trompet with `body` appended to a `[web]` section on a free port.
    pub async fn spawn(body: &str) -> anyhow::Result<Self> {
        let port = free_port()?;
        let dir = tempfile::tempdir()?;
        let config = dir.path().join("trompet.toml");
        std::fs::write(&config, Self::render(port, body))?;

        let child = Command::new(binary())
            .arg(&config)
            .env("RUST_LOG", "trompet=debug")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let relay = Self { child, port, dir };
        relay.wait_until_ready().await?;
        Ok(relay)
    }

    fn render(port: u16, body: &str) -> String {
        format!("[web]\nbind = \"127.0.0.1\"\nport = {port}\n\n{body}")
    }

    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("trompet did not start listening within 5 seconds")
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("trompet.toml")
    }

    /// Replace the configuration file and send SIGHUP.
    #[cfg(unix)]
    pub fn reload(&self, body: &str) -> anyhow::Result<()> {
        std::fs::write(self.config_path(), Self::render(self.port, body))?;
        let status = Command::new("kill")
            .args(["-HUP", &self.child.id().to_string()])
            .status()?;
        anyhow::ensure!(status.success(), "kill -HUP failed");
        Ok(())
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
