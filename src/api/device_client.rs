use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::message::{Message, Method};
use super::signing::{md5_hex, mqtt_password};
use crate::auth::token::CloudSession;
use crate::error::AppError;

const MQTT_PORT: u16 = 443;
const MAX_PACKET_SIZE: usize = 256 * 1024;
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Random per-run application id, as the official app derives it.
pub fn generate_app_id() -> String {
    md5_hex(&format!("API{}", Uuid::new_v4()))
}

pub fn reply_topic(user_id: &str, app_id: &str) -> String {
    format!("/app/{}-{}/subscribe", user_id, app_id)
}

pub fn user_topic(user_id: &str) -> String {
    format!("/app/{}/subscribe", user_id)
}

pub fn device_topic(uuid: &str) -> String {
    format!("/appliance/{}/subscribe", uuid)
}

/// Requests waiting for a reply, keyed by `messageId`.
#[derive(Debug, Clone, Default)]
pub struct PendingReplies {
    waiting: Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>,
}

impl PendingReplies {
    pub async fn register(&self, message_id: &str) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().await.insert(message_id.to_string(), tx);
        rx
    }

    /// Forget a request; true if it was still waiting.
    pub async fn cancel(&self, message_id: &str) -> bool {
        self.waiting.lock().await.remove(message_id).is_some()
    }

    /// Hand a reply to its request; false if nobody waits for it.
    pub async fn dispatch(&self, message: Message) -> bool {
        let waiter = self.waiting.lock().await.remove(message.message_id());
        match waiter {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Wait for the reply to `message_id`; a timeout drops the entry.
    pub async fn wait(
        &self,
        message_id: &str,
        rx: oneshot::Receiver<Message>,
        timeout: Duration,
        what: &str,
    ) -> Result<Message, AppError> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(AppError::Mqtt(
                "connection closed while waiting for a reply".into(),
            )),
            Err(_) => {
                self.cancel(message_id).await;
                Err(AppError::Timeout(what.to_string()))
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.waiting.lock().await.len()
    }

    /// Drop every waiter; their requests see a closed channel.
    pub async fn clear(&self) {
        self.waiting.lock().await.clear();
    }
}

/// Route one incoming publish. Returns true when it completed a request.
pub async fn route_reply(
    topic: &str,
    payload: &[u8],
    reply_topic: &str,
    key: &str,
    pending: &PendingReplies,
) -> bool {
    if topic != reply_topic {
        tracing::trace!(%topic, "ignoring push message");
        return false;
    }
    let message: Message = match serde_json::from_slice(payload) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable device reply");
            return false;
        }
    };
    if !message.verify(key) {
        tracing::warn!(message_id = %message.message_id(), "reply signature mismatch");
    }
    let message_id = message.message_id().to_string();
    let delivered = pending.dispatch(message).await;
    if !delivered {
        tracing::debug!(%message_id, "reply with no pending request");
    }
    delivered
}

/// Request/reply channel to devices through one cloud MQTT broker.
pub struct DeviceClient {
    client: AsyncClient,
    pending: PendingReplies,
    key: String,
    reply_topic: String,
    timeout: Duration,
    event_task: JoinHandle<()>,
}

fn mqtt_error(err: rumqttc::ClientError) -> AppError {
    AppError::Mqtt(err.to_string())
}

impl DeviceClient {
    /// Connect to the broker and subscribe to this client's reply topics.
    pub async fn connect(
        host: &str,
        session: &CloudSession,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let app_id = generate_app_id();
        let mut options = MqttOptions::new(format!("app:{}", app_id), host, MQTT_PORT);
        options.set_credentials(
            session.user_id.clone(),
            mqtt_password(&session.user_id, &session.key),
        );
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        options.set_transport(Transport::tls_with_default_config());

        let (client, event_loop) = AsyncClient::new(options, 10);
        let reply_topic = reply_topic(&session.user_id, &app_id);
        let pending = PendingReplies::default();
        let (ready_tx, ready_rx) = oneshot::channel();

        tracing::debug!(%host, port = MQTT_PORT, "connecting to MQTT broker");
        let event_task = tokio::spawn(handle_mqtt_events(
            event_loop,
            reply_topic.clone(),
            session.key.clone(),
            pending.clone(),
            ready_tx,
        ));

        let connected = match tokio::time::timeout(timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(AppError::Mqtt(message)),
            Ok(Err(_)) => Err(AppError::Mqtt(
                "event loop stopped before the connection was acknowledged".into(),
            )),
            Err(_) => Err(AppError::Timeout(format!("MQTT connection to {}", host))),
        };
        if let Err(e) = connected {
            event_task.abort();
            return Err(e);
        }

        client
            .subscribe(user_topic(&session.user_id), QoS::AtLeastOnce)
            .await
            .map_err(mqtt_error)?;
        client
            .subscribe(&reply_topic, QoS::AtLeastOnce)
            .await
            .map_err(mqtt_error)?;

        Ok(Self {
            client,
            pending,
            key: session.key.clone(),
            reply_topic,
            timeout,
            event_task,
        })
    }

    /// Send a message to one device and wait for its acknowledgement payload.
    pub async fn request(
        &self,
        uuid: &str,
        method: Method,
        namespace: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let message = Message::request(namespace, method, payload, &self.reply_topic, &self.key);
        let message_id = message.message_id().to_string();
        let body = serde_json::to_vec(&message)?;

        let rx = self.pending.register(&message_id).await;

        tracing::debug!(%uuid, %namespace, ?method, %message_id, "publishing device request");
        if let Err(e) = self
            .client
            .publish(device_topic(uuid), QoS::AtLeastOnce, false, body)
            .await
        {
            self.pending.cancel(&message_id).await;
            return Err(mqtt_error(e));
        }

        let what = format!("{} reply from {}", namespace, uuid);
        self.pending
            .wait(&message_id, rx, self.timeout, &what)
            .await?
            .into_payload()
    }

    /// Disconnect and stop the event loop. Further requests fail.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!(error = %e, "MQTT disconnect failed");
        }
        let _ = tokio::time::timeout(CLOSE_GRACE, &mut self.event_task).await;
        self.event_task.abort();
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}

/// Drives the event loop and hands replies to their waiting requests.
async fn handle_mqtt_events(
    mut event_loop: EventLoop,
    reply_topic: String,
    key: String,
    pending: PendingReplies,
    ready_tx: oneshot::Sender<Result<(), String>>,
) {
    let mut ready_tx = Some(ready_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                route_reply(&publish.topic, &publish.payload, &reply_topic, &key, &pending).await;
            }
            Ok(_) => {}
            Err(e) => {
                match ready_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(e.to_string()));
                    }
                    None => tracing::debug!(error = %e, "MQTT event loop stopped"),
                }
                break;
            }
        }
    }

    pending.clear().await;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::message::NS_ELECTRICITY;

    const REPLY_TOPIC: &str = "/app/42-abc/subscribe";
    const KEY: &str = "secret-key";

    fn ack(message_id: &str) -> Vec<u8> {
        let message = Message::build(
            NS_ELECTRICITY,
            Method::GetAck,
            json!({"electricity": {"channel": 0, "power": 12000}}),
            "/appliance/u1/publish",
            KEY,
            message_id.to_string(),
            1_700_000_000,
        );
        serde_json::to_vec(&message).unwrap()
    }

    #[test]
    fn test_topics() {
        assert_eq!(reply_topic("42", "abc"), "/app/42-abc/subscribe");
        assert_eq!(user_topic("42"), "/app/42/subscribe");
        assert_eq!(device_topic("u1"), "/appliance/u1/subscribe");
    }

    #[test]
    fn test_app_id_is_md5_hex() {
        let id = generate_app_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_app_id());
    }

    #[tokio::test]
    async fn test_reply_matched_by_message_id() {
        let pending = PendingReplies::default();
        let rx_a = pending.register("a").await;
        let rx_b = pending.register("b").await;

        assert!(route_reply(REPLY_TOPIC, &ack("b"), REPLY_TOPIC, KEY, &pending).await);
        assert_eq!(pending.len().await, 1);

        let reply = pending
            .wait("b", rx_b, Duration::from_secs(1), "b")
            .await
            .unwrap();
        assert_eq!(reply.message_id(), "b");
        assert_eq!(reply.into_payload().unwrap()["electricity"]["power"], 12000);

        drop(rx_a);
        assert!(pending.cancel("a").await);
        assert_eq!(pending.len().await, 0);
    }

    #[tokio::test]
    async fn test_unrelated_publishes_are_ignored() {
        let pending = PendingReplies::default();
        let _rx = pending.register("a").await;

        // Push notifications arrive on the user topic.
        assert!(!route_reply("/app/42/subscribe", &ack("a"), REPLY_TOPIC, KEY, &pending).await);
        assert!(!route_reply(REPLY_TOPIC, b"not json", REPLY_TOPIC, KEY, &pending).await);
        assert!(!route_reply(REPLY_TOPIC, &ack("zzz"), REPLY_TOPIC, KEY, &pending).await);
        assert_eq!(pending.len().await, 1);
    }

    #[tokio::test]
    async fn test_timeout_removes_pending_entry() {
        let pending = PendingReplies::default();
        let rx = pending.register("slow").await;

        let err = pending
            .wait("slow", rx, Duration::from_millis(20), "Appliance.System.All reply from u1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert_eq!(pending.len().await, 0);

        // A late reply finds nobody waiting.
        assert!(!route_reply(REPLY_TOPIC, &ack("slow"), REPLY_TOPIC, KEY, &pending).await);
    }

    #[tokio::test]
    async fn test_cleared_waiters_see_closed_connection() {
        let pending = PendingReplies::default();
        let rx = pending.register("a").await;
        pending.clear().await;

        let err = pending
            .wait("a", rx, Duration::from_secs(1), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Mqtt(_)));
    }
}
