//! Fan-out of rendered messages to IRC channels.

use std::sync::Arc;

use tracing::debug;

use crate::irc::NetworkManager;
use crate::listeners::Notifier;
use crate::state::SharedProjects;

/// Delivers a project's messages to every channel the project is routed to.
pub struct Dispatcher {
    projects: SharedProjects,
    networks: Arc<NetworkManager>,
}

impl Dispatcher {
    pub fn new(projects: SharedProjects, networks: Arc<NetworkManager>) -> Self {
        Self { projects, networks }
    }

    /// Post `message` for `project`, returning how many channels accepted it.
    pub fn dispatch(&self, project: &str, message: &str) -> usize {
        let table = Arc::clone(&self.projects.read());
        let Some(project) = table.get(project) else {
            debug!(project = %project, "dropped message for unknown project");
            return 0;
        };

        let mut delivered = 0;
        for (network, channels) in project.channels() {
            for channel in channels {
                if self.networks.post(network, channel, message) {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

impl Notifier for Dispatcher {
    fn notify(&self, project: &str, message: &str) {
        self.dispatch(project, message);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use crate::config::Config;
    use crate::listeners::Registry;
    use crate::state::Relay;

    #[tokio::test]
    async fn unknown_project_goes_nowhere() {
        let relay = Relay::new(Registry::builtin());
        assert_eq!(relay.dispatcher().dispatch("nope", "hello"), 0);
    }

    #[tokio::test]
    async fn disconnected_network_drops_messages() {
        let relay = Relay::new(Registry::builtin());
        let config: Config = toml::from_str(
            r##"
[reconnect]
initial_delay_ms = 50

[networks.alpha]
servers = [["127.0.0.1", 1]]
nick = "trompet"

[projects.widget]
token = "w"
channels = { alpha = ["#widget"] }
"##,
        )
        .unwrap();
        relay.reconfigure(&config).await.unwrap();
        assert_eq!(relay.dispatcher().dispatch("widget", "hello"), 0);
        relay.shutdown().await;
    }

    #[tokio::test]
    async fn delivers_to_every_routed_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let relay = Relay::new(Registry::builtin());
        let config: Config = toml::from_str(&format!(
            r##"
[networks.local]
servers = [["127.0.0.1", {port}]]
nick = "trompet"

[projects.widget]
token = "w"
channels = {{ local = ["#a", "#b"] }}
"##
        ))
        .unwrap();
        relay.reconfigure(&config).await.unwrap();

        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        write
            .write_all(b":irc.test 001 trompet :Welcome\r\n")
            .await
            .unwrap();

        let mut joined = Vec::new();
        while joined.len() < 2 {
            let line = lines.next_line().await.unwrap().unwrap();
            if let Some(channel) = line.strip_prefix("JOIN ") {
                joined.push(channel.to_string());
            }
        }

        let delivered = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let n = relay.dispatcher().dispatch("widget", "hello");
                if n > 0 {
                    break n;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(delivered, 2);

        let mut seen = Vec::new();
        while seen.len() < 2 {
            let line = lines.next_line().await.unwrap().unwrap();
            if line.starts_with("PRIVMSG ") {
                seen.push(line);
            }
        }
        seen.sort();
        assert_eq!(seen, ["PRIVMSG #a :hello", "PRIVMSG #b :hello"]);
        relay.shutdown().await;
    }
}
