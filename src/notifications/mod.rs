use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{Charge, SiteSelectionToken, User};
use crate::error::Result;

pub mod email;

/// Payment outcomes worth telling the member about. Dispatch happens after
/// the financial transaction commits; a failed delivery never rolls money
/// state back.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    InstallmentReceived {
        user: User,
        charge: Charge,
        outstanding_cents: i64,
    },
    FullyPaid {
        user: User,
        charge: Charge,
    },
    SiteSelectionPaid {
        user: User,
        charge: Charge,
        token: SiteSelectionToken,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    async fn notify(&self, event: &PaymentEvent) -> Result<()>;
}

pub struct NotifierManager {
    notifiers: RwLock<Vec<Arc<dyn Notifier>>>,
}

impl NotifierManager {
    pub fn new() -> Self {
        Self {
            notifiers: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, notifier: Arc<dyn Notifier>) {
        if notifier.is_enabled() {
            let mut notifiers = self.notifiers.write().await;
            notifiers.push(notifier);
            tracing::info!("Registered notifier: {}", notifiers.last().unwrap().name());
        }
    }

    /// Fire-and-forget delivery on a background task. Callers return to
    /// their request immediately.
    pub fn dispatch(self: &Arc<Self>, event: PaymentEvent) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.deliver(&event).await;
        });
    }

    pub async fn deliver(&self, event: &PaymentEvent) {
        let notifiers = self.notifiers.read().await;

        for notifier in notifiers.iter() {
            if !notifier.is_enabled() {
                continue;
            }

            match notifier.notify(event).await {
                Ok(_) => {
                    tracing::debug!("Notifier {} delivered event", notifier.name());
                }
                Err(e) => {
                    tracing::error!(
                        "Notifier {} failed to deliver event: {:?}",
                        notifier.name(),
                        e
                    );
                    // Keep going; one broken channel must not mute the rest
                }
            }
        }
    }
}

impl Default for NotifierManager {
    fn default() -> Self {
        Self::new()
    }
}
