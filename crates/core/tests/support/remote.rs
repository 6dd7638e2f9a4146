//! Scriptable remote implementing both `MediaUploader` and `RecordClient`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_core::{CreateRecordRequest, MediaUploadRequest, MediaUploader, RecordClient};
use fieldsync_domain::RemoteError;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct FakeRemote {
    uploads: Mutex<Vec<MediaUploadRequest>>,
    creates: Mutex<Vec<CreateRecordRequest>>,
    deletes: Mutex<Vec<String>>,
    upload_failures: Mutex<VecDeque<RemoteError>>,
    create_failures: Mutex<VecDeque<RemoteError>>,
    create_delay: Mutex<Option<Duration>>,
    create_gate: Mutex<Option<Arc<Semaphore>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started_creates: AtomicUsize,
}

impl FakeRemote {
    /// Queue failures returned by the next upload calls, in order.
    pub fn fail_uploads(&self, errors: impl IntoIterator<Item = RemoteError>) {
        self.upload_failures.lock().extend(errors);
    }

    pub fn fail_creates(&self, errors: impl IntoIterator<Item = RemoteError>) {
        self.create_failures.lock().extend(errors);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock() = Some(delay);
    }

    /// Block create calls until [`Self::release_creates`] hands out permits.
    pub fn hold_creates(&self) {
        *self.create_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_creates(&self, permits: usize) {
        if let Some(gate) = self.create_gate.lock().as_ref() {
            gate.add_permits(permits);
        }
    }

    pub fn uploads(&self) -> Vec<MediaUploadRequest> {
        self.uploads.lock().clone()
    }

    pub fn creates(&self) -> Vec<CreateRecordRequest> {
        self.creates.lock().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().clone()
    }

    pub fn started_creates(&self) -> usize {
        self.started_creates.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaUploader for FakeRemote {
    async fn upload_media(&self, request: &MediaUploadRequest) -> Result<String, RemoteError> {
        self.uploads.lock().push(request.clone());
        if let Some(err) = self.upload_failures.lock().pop_front() {
            return Err(err);
        }
        Ok(format!("media/{}", request.attachment_id))
    }
}

#[async_trait]
impl RecordClient for FakeRemote {
    async fn create_record(&self, request: &CreateRecordRequest) -> Result<String, RemoteError> {
        self.started_creates.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.create_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate open").forget();
        }
        let delay = *self.create_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.creates.lock().push(request.clone());
        if let Some(err) = self.create_failures.lock().pop_front() {
            return Err(err);
        }
        Ok(format!("remote-{}", request.record_id))
    }

    async fn delete_record(&self, remote_id: &str) -> Result<(), RemoteError> {
        self.deletes.lock().push(remote_id.to_string());
        Ok(())
    }
}
