//! Round-robin backend pool
//!
//! Several equivalent physical endpoints (for example the same model in
//! different regions) exposed as one [`Backend`]. Every call goes to the
//! next endpoint in rotation.

use crate::config::PoolConfig;
use crate::error::{RelayError, RelayResult};
use crate::llm::backend::{Backend, ImageReader};
use crate::llm::messages::{Message, MimeType};
use crate::llm::streaming::StreamSender;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One content filtering rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    /// Harm category the rule applies to
    pub category: String,
    /// Blocking threshold for that category
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }
}

/// Per-endpoint rules applied to every call routed through a pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPolicy {
    #[serde(default)]
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a safety setting
    pub fn with_safety_setting(mut self, setting: SafetySetting) -> Self {
        self.safety_settings.push(setting);
        self
    }
}

/// A labelled pool member
#[derive(Debug)]
pub struct PoolEndpoint<E> {
    label: String,
    endpoint: E,
}

impl<E> PoolEndpoint<E> {
    pub fn new(label: impl Into<String>, endpoint: E) -> Self {
        Self {
            label: label.into(),
            endpoint,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }
}

/// Thread-safe rotating selector over equivalent endpoints
#[derive(Debug)]
pub struct RoundRobinPool<E> {
    endpoints: Vec<PoolEndpoint<E>>,
    /// Monotonic rotation counter; the selected index is `counter % len`
    counter: AtomicUsize,
    /// Index of the endpoint selected last
    last_selected: AtomicUsize,
    policy: RwLock<GenerationPolicy>,
}

impl<E> RoundRobinPool<E> {
    /// Create a pool. Fails with [`RelayError::EmptyPool`] when `endpoints` is empty.
    pub fn new(endpoints: Vec<PoolEndpoint<E>>) -> RelayResult<Self> {
        if endpoints.is_empty() {
            return Err(RelayError::EmptyPool);
        }
        Ok(Self {
            endpoints,
            counter: AtomicUsize::new(0),
            last_selected: AtomicUsize::new(0),
            policy: RwLock::new(GenerationPolicy::default()),
        })
    }

    /// Create a pool labelling endpoints from configuration.
    ///
    /// Without configured labels endpoints are named `endpoint-{index}`.
    pub fn from_config(config: &PoolConfig, endpoints: Vec<E>) -> RelayResult<Self> {
        if !config.labels.is_empty() && config.labels.len() != endpoints.len() {
            return Err(RelayError::config(format!(
                "pool has {} endpoints but {} labels",
                endpoints.len(),
                config.labels.len()
            )));
        }
        let members = endpoints
            .into_iter()
            .enumerate()
            .map(|(i, endpoint)| {
                let label = config
                    .labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("endpoint-{}", i));
                PoolEndpoint::new(label, endpoint)
            })
            .collect();
        Self::new(members)
    }

    /// Advance the rotation and return the selected index.
    ///
    /// The read and the increment are one atomic step, so concurrent
    /// callers never share a pre-increment value.
    pub fn next_index(&self) -> usize {
        let len = self.endpoints.len();
        if len == 1 {
            return 0;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % len;
        self.last_selected.store(index, Ordering::Relaxed);
        index
    }

    /// Select the next endpoint in rotation
    pub fn select_next(&self) -> &PoolEndpoint<E> {
        let endpoint = &self.endpoints[self.next_index()];
        debug!(label = %endpoint.label, "selected pool endpoint");
        endpoint
    }

    /// Label of the endpoint selected last
    pub fn current_label(&self) -> &str {
        &self.current().label
    }

    fn current(&self) -> &PoolEndpoint<E> {
        let index = self.last_selected.load(Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[index]
    }

    /// Current generation policy
    pub fn policy(&self) -> GenerationPolicy {
        self.policy.read().clone()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl<E: Backend> RoundRobinPool<E> {
    /// Replace the generation policy and push it to every endpoint
    pub fn set_policy(&self, policy: GenerationPolicy) {
        let mut current = self.policy.write();
        for member in &self.endpoints {
            member.endpoint.apply_policy(&policy);
        }
        *current = policy;
    }
}

#[async_trait]
impl<E: Backend> Backend for RoundRobinPool<E> {
    async fn generate(&self, system_prompt: &str, prompt: &str) -> RelayResult<String> {
        self.select_next()
            .endpoint
            .generate(system_prompt, prompt)
            .await
    }

    async fn generate_stream(
        &self,
        system_prompt: &str,
        prompt: &str,
        events: StreamSender,
        cancel: CancellationToken,
    ) {
        self.select_next()
            .endpoint
            .generate_stream(system_prompt, prompt, events, cancel)
            .await
    }

    async fn generate_with_image(
        &self,
        prompt: &str,
        image: ImageReader,
        mime_type: MimeType,
    ) -> RelayResult<String> {
        self.select_next()
            .endpoint
            .generate_with_image(prompt, image, mime_type)
            .await
    }

    async fn generate_with_images(
        &self,
        prompt: &str,
        images: Vec<ImageReader>,
        mime_types: Vec<MimeType>,
    ) -> RelayResult<String> {
        self.select_next()
            .endpoint
            .generate_with_images(prompt, images, mime_types)
            .await
    }

    async fn generate_with_messages(&self, messages: Vec<Message>) -> RelayResult<String> {
        self.select_next()
            .endpoint
            .generate_with_messages(messages)
            .await
    }

    /// `{label}/{model}` of the endpoint selected last
    fn model(&self) -> String {
        let current = self.current();
        format!("{}/{}", current.label, current.endpoint.model())
    }

    fn apply_policy(&self, policy: &GenerationPolicy) {
        self.set_policy(policy.clone());
    }
}
