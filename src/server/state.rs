use std::sync::Arc;
use std::time::Instant;

use crate::channel::{ChannelDispatcher, ChannelError, ChatSender, EmailSender, InAppSender};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::notification::NotificationEngine;
use crate::scheduler::Scheduler;
use crate::store::Stores;
use crate::template::TemplateService;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub stores: Stores,
    pub engine: Arc<NotificationEngine>,
    pub templates: Arc<TemplateService>,
    pub dispatcher: Arc<ChannelDispatcher>,
    pub inbox: Arc<InAppSender>,
    pub scheduler: Arc<Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the production senders from configuration
    pub fn new(settings: Settings, stores: Stores) -> Result<Self, ChannelError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let email = Arc::new(EmailSender::new(&settings.email)?);
        let chat = Arc::new(ChatSender::new(settings.chat.clone())?);
        let inbox = Arc::new(InAppSender::new(settings.in_app.clone(), clock.clone()));

        let dispatcher = ChannelDispatcher::with_retry(
            email,
            chat,
            inbox.clone(),
            settings.retry.clone(),
        );

        Ok(Self::with_components(
            settings, stores, dispatcher, inbox, clock,
        ))
    }

    /// Assemble state around an existing dispatcher and inbox
    pub fn with_components(
        settings: Settings,
        stores: Stores,
        dispatcher: ChannelDispatcher,
        inbox: Arc<InAppSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let engine = Arc::new(NotificationEngine::new(
            stores.notifications.clone(),
            stores.templates.clone(),
            dispatcher.clone(),
            clock.clone(),
        ));
        let templates = Arc::new(TemplateService::new(stores.templates.clone(), clock.clone()));
        let scheduler = Arc::new(Scheduler::new(engine.clone(), &settings.scheduler));

        Self {
            settings: Arc::new(settings),
            stores,
            engine,
            templates,
            dispatcher,
            inbox,
            scheduler,
            clock,
            started_at: Instant::now(),
        }
    }
}
