//! In-process stand-ins for the explanation model and the object store

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use qvd_api::services::{ExplanationGenerator, GenerationError, ImageStore, ImageStoreError};

/// Returns a canned explanation (or a canned failure) and records prompts
pub struct FakeGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ExplanationGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(GenerationError::Api(503, "model overloaded".to_string())),
        }
    }
}

/// Holds every `generate` call until the test releases it
pub struct GatedGenerator {
    reply: String,
    entered: Notify,
    release: Notify,
}

impl GatedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Wait until a `generate` call is in flight
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl ExplanationGenerator for GatedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// One `put_object` call
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Keeps uploads in memory
#[derive(Default)]
pub struct FakeImageStore {
    objects: Mutex<Vec<StoredObject>>,
}

impl FakeImageStore {
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ImageStoreError> {
        self.objects.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            bytes,
            content_type: content_type.map(str::to_string),
        });
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://images.test/{}", key)
    }
}
