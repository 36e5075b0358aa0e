//! Mount/unmount wrapper that ties a coordinator to the session registry.

use crate::registry::{Registration, SessionRegistry};
use crate::session::{VoiceCoordinator, VoiceSession};
use std::sync::Arc;
use tracing::info;

/// Owns the coordinator for the lifetime of the hosting component.
pub struct VoiceProvider {
    coordinator: Arc<VoiceCoordinator>,
    registry: Arc<SessionRegistry>,
    registration: Registration,
}

impl VoiceProvider {
    /// Takes ownership of `coordinator` and registers it with `registry`.
    pub fn mount(coordinator: VoiceCoordinator, registry: Arc<SessionRegistry>) -> Self {
        let coordinator = Arc::new(coordinator);
        let registration = registry.register(coordinator.clone() as Arc<dyn VoiceSession>);
        info!(registration = registration.id().get(), "voice provider mounted");
        Self {
            coordinator,
            registry,
            registration,
        }
    }

    pub fn coordinator(&self) -> &Arc<VoiceCoordinator> {
        &self.coordinator
    }

    /// Registers the coordinator again. Returns the mount-time registration
    /// while it is still current.
    pub fn register(&self) -> Registration {
        self.registry
            .register(self.coordinator.clone() as Arc<dyn VoiceSession>)
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Tears down the connection unconditionally and withdraws the
    /// registration.
    pub async fn unmount(self) {
        self.coordinator.teardown().await;
        self.registry.unregister(&self.registration);
        info!("voice provider unmounted");
    }
}
