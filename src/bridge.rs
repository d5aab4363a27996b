//! Async bridge for denoising sessions
//!
//! Session calls block for the length of an inference, so they run on the
//! tokio blocking pool instead of an executor thread.

use std::sync::Arc;

use tokio::task;
use tracing::warn;

use crate::error::{DenoiseError, Result};
use crate::neural::ModelType;
use crate::session::DenoisingSession;

/// Cloneable async handle to a shared `DenoisingSession`
#[derive(Clone)]
pub struct AsyncSession {
    inner: Arc<DenoisingSession>,
}

impl AsyncSession {
    pub fn new(session: DenoisingSession) -> Self {
        Self {
            inner: Arc::new(session),
        }
    }

    pub fn from_shared(session: Arc<DenoisingSession>) -> Self {
        Self { inner: session }
    }

    pub fn session(&self) -> &Arc<DenoisingSession> {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DenoisingSession) -> Result<T> + Send + 'static,
    {
        let session = Arc::clone(&self.inner);
        task::spawn_blocking(move || f(&session))
            .await
            .map_err(|e| DenoiseError::Io(std::io::Error::other(e)))?
    }

    pub async fn process(&self, pcm: Vec<u8>, sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
        self.run(move |s| s.process(&pcm, sample_rate, channels))
            .await
    }

    pub async fn reset(&self) -> Result<()> {
        self.run(|s| s.reset()).await
    }

    pub async fn change_model_type(&self, model_type: ModelType) -> Result<()> {
        self.run(move |s| s.change_model_type(model_type)).await
    }

    pub async fn model_type(&self) -> Result<Option<ModelType>> {
        self.run(|s| s.model_type()).await
    }

    /// Close the session. Like `DenoisingSession::close`, never fails; a
    /// blocking task that cannot be joined is logged and the session is
    /// closed on the calling thread instead.
    pub async fn close(&self) {
        let session = Arc::clone(&self.inner);
        if let Err(e) = task::spawn_blocking(move || session.close()).await {
            warn!(session = %self.inner.id(), error = %e, "Close task failed, closing inline");
            self.inner.close();
        }
    }
}
