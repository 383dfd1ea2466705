use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::store::RecordStore;
use crate::services::callback::CallbackReceiver;
use crate::services::dispatcher::Dispatcher;
use crate::services::webhook::WebhookClient;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub callbacks: Arc<CallbackReceiver>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        webhook: WebhookClient,
        config: Arc<AppConfig>,
    ) -> Self {
        let webhook = Arc::new(webhook);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&webhook),
            config,
        ));
        let callbacks = Arc::new(CallbackReceiver::new(Arc::clone(&store)));
        Self {
            store,
            dispatcher,
            callbacks,
        }
    }
}
