//! Shared helpers for service integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thunder_core::TableRef;
use thunder_services::{CommitEffects, CommitObserver, EditorWorkspace, ThunderSettings};
use thunder_staging::StagedChangeBuffer;
use thunder_testing::{MockBackend, connection, sample_backend};

/// Observer that remembers every notification
#[derive(Default)]
pub struct RecordingObserver {
    effects: Mutex<Vec<CommitEffects>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn effects(&self) -> Vec<CommitEffects> {
        self.effects.lock().clone()
    }
}

#[async_trait]
impl CommitObserver for RecordingObserver {
    async fn after_commit(&self, effects: &CommitEffects) {
        self.effects.lock().push(effects.clone());
    }
}

pub fn users() -> TableRef {
    TableRef::new("public", "users")
}

pub fn users_buffer() -> StagedChangeBuffer {
    StagedChangeBuffer::with_target(users())
}

/// Sample catalog with two connections, `local` active
pub fn backend() -> Arc<MockBackend> {
    Arc::new(
        sample_backend()
            .with_connection(connection("local", "local", true))
            .with_connection(connection("staging", "staging", false)),
    )
}

pub fn workspace(backend: &Arc<MockBackend>) -> EditorWorkspace {
    thunder_testing::init_test_logging();
    EditorWorkspace::new(backend.clone(), &ThunderSettings::default())
}
