use crate::error::{RegistryError, RegistryResult};
use log::{debug, error, warn};
use std::sync::{Arc, RwLock};

/// Domain events raised by package writes. Payloads carry the package fullname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    VersionAdded {
        fullname: String,
        version: String,
        tag: Option<String>,
    },
    VersionRemoved {
        fullname: String,
        version: String,
    },
    VersionDeprecated {
        fullname: String,
        versions: Vec<String>,
    },
    TagAdded {
        fullname: String,
        tag: String,
    },
    TagChanged {
        fullname: String,
        tag: String,
    },
    TagRemoved {
        fullname: String,
        tag: String,
    },
    MaintainerChanged {
        fullname: String,
    },
    PackageBlocked {
        fullname: String,
    },
    PackageUnblocked {
        fullname: String,
    },
    PackageUnpublished {
        fullname: String,
    },
}

impl RegistryEvent {
    pub fn fullname(&self) -> &str {
        match self {
            RegistryEvent::VersionAdded { fullname, .. }
            | RegistryEvent::VersionRemoved { fullname, .. }
            | RegistryEvent::VersionDeprecated { fullname, .. }
            | RegistryEvent::TagAdded { fullname, .. }
            | RegistryEvent::TagChanged { fullname, .. }
            | RegistryEvent::TagRemoved { fullname, .. }
            | RegistryEvent::MaintainerChanged { fullname }
            | RegistryEvent::PackageBlocked { fullname }
            | RegistryEvent::PackageUnblocked { fullname }
            | RegistryEvent::PackageUnpublished { fullname } => fullname,
        }
    }
}

#[derive(Debug)]
pub enum HandlerError {
    /// Logged at the dispatch boundary; the write that raised the event stands.
    Recoverable(String),
    /// Propagated to the caller of [`EventBus::emit`].
    Fatal(RegistryError),
}

pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;
    fn handle(&self, event: &RegistryEvent) -> Result<(), HandlerError>;
}

/// Synchronous dispatch to handlers in subscription order
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handlers.read().map(|h| h.len()).unwrap_or_default();
        f.debug_struct("EventBus").field("handlers", &count).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push(handler),
            Err(poisoned) => poisoned.into_inner().push(handler),
        }
    }

    pub fn emit(&self, event: RegistryEvent) -> RegistryResult<()> {
        let handlers = match self.handlers.read() {
            Ok(handlers) => handlers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        debug!("Dispatching {:?} to {} handlers", event, handlers.len());

        for handler in handlers {
            match handler.handle(&event) {
                Ok(()) => {}
                Err(HandlerError::Recoverable(message)) => {
                    warn!(
                        "Handler {} failed on {:?}: {}",
                        handler.name(),
                        event,
                        message
                    );
                }
                Err(HandlerError::Fatal(e)) => {
                    error!("Handler {} aborted {:?}: {}", handler.name(), event, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail: Option<fn() -> HandlerError>,
    }

    impl EventHandler for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn handle(&self, event: &RegistryEvent) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(event.fullname().to_string());
            match self.fail {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    fn recorder(fail: Option<fn() -> HandlerError>) -> Arc<Recorder> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[test]
    fn test_recoverable_failure_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let failing = recorder(Some(|| HandlerError::Recoverable("search down".to_string())));
        let after = recorder(None);
        bus.subscribe(failing.clone());
        bus.subscribe(after.clone());

        bus.emit(RegistryEvent::MaintainerChanged {
            fullname: "@scope/foo".to_string(),
        })
        .unwrap();

        assert_eq!(*failing.seen.lock().unwrap(), vec!["@scope/foo"]);
        assert_eq!(*after.seen.lock().unwrap(), vec!["@scope/foo"]);
    }

    #[test]
    fn test_fatal_failure_propagates() {
        let bus = EventBus::new();
        let fatal = recorder(Some(|| {
            HandlerError::Fatal(RegistryError::Conflict("abort".to_string()))
        }));
        let after = recorder(None);
        bus.subscribe(fatal);
        bus.subscribe(after.clone());

        let result = bus.emit(RegistryEvent::PackageBlocked {
            fullname: "foo".to_string(),
        });
        assert!(matches!(result, Err(RegistryError::Conflict(_))));
        assert!(after.seen.lock().unwrap().is_empty());
    }
}
