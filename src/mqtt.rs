//! MQTT transport: the event loop driving discovery and ingestion.

use std::collections::HashMap;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::discovery::DiscoveryWatcher;
use crate::feature::SensorKind;
use crate::ingest::UpdateIngestor;

/// Delay between reconnection attempts after a transport error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Bridges the broker to the discovery watcher and the update ingestor.
///
/// The routing table maps each subscribed feature-value topic to its
/// (device, feature) pair. It lives on this task alone; discovery hands
/// over new wiring requests as plain return values, so the event loop is
/// the only place subscriptions are created.
pub struct MqttBridge {
    config: MqttConfig,
    discovery: DiscoveryWatcher,
    ingestor: UpdateIngestor,
}

impl MqttBridge {
    pub fn new(config: MqttConfig, discovery: DiscoveryWatcher, ingestor: UpdateIngestor) -> Self {
        Self {
            config,
            discovery,
            ingestor,
        }
    }

    /// Run the bridge until the shutdown signal is received.
    ///
    /// A transport error before the first successful connect is fatal;
    /// after that, errors are logged and the connection retried with a
    /// fixed delay. Update handling itself never blocks the loop beyond
    /// one payload parse and one registry write.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let client_id = format!("{}-{}", self.config.client_id, std::process::id());
        let mut options =
            MqttOptions::new(client_id.clone(), self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_last_will(LastWill::new(
            "leave",
            client_id.clone(),
            QoS::AtLeastOnce,
            false,
        ));
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);

        let mut routes: HashMap<String, (String, SensorKind)> = HashMap::new();
        let mut connected_once = false;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown signal received, stopping MQTT bridge");
                        break;
                    }
                }

                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(host = %self.config.host, port = self.config.port, "Connected to broker");
                        connected_once = true;
                        client
                            .subscribe(self.discovery.announce_filter(), QoS::AtLeastOnce)
                            .await?;
                        // Restore feature subscriptions after a reconnect.
                        for topic in routes.keys() {
                            client.subscribe(topic.clone(), QoS::AtLeastOnce).await?;
                        }
                    }

                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let topic = publish.topic.as_str();
                        if self.discovery.is_announcement(topic) {
                            for sub in self.discovery.handle_announcement(topic, &publish.payload) {
                                if routes.contains_key(&sub.topic) {
                                    continue;
                                }
                                client.subscribe(sub.topic.clone(), QoS::AtLeastOnce).await?;
                                debug!(
                                    topic = %sub.topic,
                                    device = %sub.device,
                                    feature = %sub.kind,
                                    "watching feature"
                                );
                                routes.insert(sub.topic, (sub.device, sub.kind));
                            }
                        } else if let Some((device, kind)) = routes.get(topic) {
                            self.ingestor.handle_update(device, *kind, &publish.payload);
                        } else {
                            debug!(topic, "publish on unrouted topic, ignoring");
                        }
                    }

                    Ok(_) => {}

                    Err(e) if !connected_once => {
                        return Err(anyhow::anyhow!(
                            "failed to establish connection with broker: {e}"
                        ));
                    }

                    Err(e) => {
                        warn!(error = %e, "transport error, reconnecting");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }

        let _ = client.disconnect().await;
        info!("Disconnected from broker");
        Ok(())
    }
}
