//! The `Notify` service.

use adapters::{Notification, Notifier};
use async_trait::async_trait;
use config::SharedConfig;
use errors::ServiceError;
use plugin::handler::typed;
use plugin::{InitError, MethodTable, Plugin, Service};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostRequest {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    /// Play the configured sound.
    pub audible: bool,
    /// Delay before posting, in milliseconds.
    pub after: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SayRequest {
    pub text: String,
    pub voice: String,
    /// Delay before speaking, in milliseconds.
    pub after: u64,
}

/// Registers desktop notifications as the `Notify` service. Always active.
pub struct NotifyPlugin {
    notifier: Arc<dyn Notifier>,
}

impl NotifyPlugin {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl Plugin for NotifyPlugin {
    fn init(&self, config: &SharedConfig) -> Result<Arc<dyn Service>, InitError> {
        Ok(Arc::new(NotifyService {
            config: config.clone(),
            notifier: Arc::clone(&self.notifier),
        }))
    }
}

struct NotifyService {
    config: SharedConfig,
    notifier: Arc<dyn Notifier>,
}

/// Sleeps for `after` milliseconds. Dropping the request future cancels the
/// wait along with the call.
async fn delay(after: u64) {
    if after > 0 {
        debug!(after_ms = after, "Delaying delivery");
        tokio::time::sleep(Duration::from_millis(after)).await;
    }
}

impl NotifyService {
    async fn post(&self, req: PostRequest) -> Result<bool, ServiceError> {
        if req.title.is_empty() && req.body.is_empty() {
            return Err(ServiceError::invalid_request(
                "missing notification body and title",
            ));
        }
        let sound = req
            .audible
            .then(|| self.config.current().notify.sound.clone());
        let notification = Notification {
            title: req.title,
            subtitle: req.subtitle,
            body: req.body,
            sound,
        };
        delay(req.after).await;
        self.notifier.post(&notification).await?;
        Ok(true)
    }

    async fn say(&self, req: SayRequest) -> Result<bool, ServiceError> {
        if req.text.is_empty() {
            return Err(ServiceError::invalid_request("empty text"));
        }
        let voice = if req.voice.is_empty() {
            self.config.current().notify.voice.clone()
        } else {
            req.voice
        };
        delay(req.after).await;
        self.notifier.say(&req.text, &voice).await?;
        Ok(true)
    }
}

#[async_trait]
impl Service for NotifyService {
    fn methods(self: Arc<Self>) -> MethodTable {
        let post = Arc::clone(&self);
        let say = self;
        MethodTable::new()
            .with(
                "Post",
                typed(move |req: PostRequest| {
                    let svc = Arc::clone(&post);
                    async move { svc.post(req).await }
                }),
            )
            .with(
                "Say",
                typed(move |req: SayRequest| {
                    let svc = Arc::clone(&say);
                    async move { svc.say(req).await }
                }),
            )
    }
}
