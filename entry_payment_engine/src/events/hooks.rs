use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, RegistrationConfirmedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub registration_confirmed_producer: Vec<EventProducer<RegistrationConfirmedEvent>>,
}

pub struct EventHandlers {
    pub on_registration_confirmed: Option<EventHandler<RegistrationConfirmedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_registration_confirmed = hooks.on_registration_confirmed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_registration_confirmed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_registration_confirmed {
            result.registration_confirmed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_registration_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_registration_confirmed: Option<Handler<RegistrationConfirmedEvent>>,
}

impl EventHooks {
    pub fn on_registration_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RegistrationConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_registration_confirmed = Some(Arc::new(f));
        self
    }
}
