//! Application-wide registry of the voice session implementation.

use crate::session::VoiceSession;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A registered voice session implementation.
#[derive(Clone)]
pub struct Registration {
    id: RegistrationId,
    session: Arc<dyn VoiceSession>,
}

impl Registration {
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn session(&self) -> &Arc<dyn VoiceSession> {
        &self.session
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}

/// Holds the one voice session the application routes intents to.
///
/// Registration is keyed by instance identity: registering the same `Arc`
/// again returns the existing [`Registration`] unchanged. Registering a
/// different instance replaces the previous one.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    current: RwLock<Option<Registration>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: Arc<dyn VoiceSession>) -> Registration {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = current.as_ref() {
            if Arc::ptr_eq(&existing.session, &session) {
                debug!(id = existing.id.0, "voice session already registered");
                return existing.clone();
            }
            info!(replaced = existing.id.0, "replacing registered voice session");
        }

        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let registration = Registration { id, session };
        *current = Some(registration.clone());
        info!(id = id.0, "voice session registered");
        registration
    }

    /// Removes `registration` if it is still the current one.
    pub fn unregister(&self, registration: &Registration) -> bool {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some(existing) if existing.id == registration.id => {
                *current = None;
                info!(id = registration.id.0, "voice session unregistered");
                true
            }
            _ => false,
        }
    }

    /// The session intents should be routed to, if any.
    pub fn active(&self) -> Option<Arc<dyn VoiceSession>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|registration| Arc::clone(&registration.session))
    }

    /// Number of distinct registrations made so far.
    pub fn registrations_made(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceError;
    use async_trait::async_trait;
    use parley_types::SessionConfig;

    struct NoopSession;

    #[async_trait]
    impl VoiceSession for NoopSession {
        async fn start(&self, _config: SessionConfig) -> Result<(), VoiceError> {
            Ok(())
        }
        async fn end(&self) -> Result<(), VoiceError> {
            Ok(())
        }
        async fn send_text(&self, _message: &str) -> Result<(), VoiceError> {
            Ok(())
        }
        async fn send_contextual_update(&self, _update: &str) -> Result<(), VoiceError> {
            Ok(())
        }
    }

    #[test]
    fn test_same_instance_registers_once() {
        let registry = SessionRegistry::new();
        let session: Arc<dyn VoiceSession> = Arc::new(NoopSession);

        let first = registry.register(session.clone());
        let second = registry.register(session.clone());

        assert_eq!(first.id(), second.id());
        assert_eq!(registry.registrations_made(), 1);
        assert!(Arc::ptr_eq(&registry.active().unwrap(), &session));
    }

    #[test]
    fn test_new_instance_replaces_previous() {
        let registry = SessionRegistry::new();
        let first = registry.register(Arc::new(NoopSession));
        let replacement: Arc<dyn VoiceSession> = Arc::new(NoopSession);
        let second = registry.register(replacement.clone());

        assert_ne!(first.id(), second.id());
        assert_eq!(registry.registrations_made(), 2);
        assert!(Arc::ptr_eq(&registry.active().unwrap(), &replacement));

        // The replaced registration can no longer unregister anything.
        assert!(!registry.unregister(&first));
        assert!(registry.unregister(&second));
        assert!(registry.active().is_none());
    }
}
