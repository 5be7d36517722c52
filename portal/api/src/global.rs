use std::sync::Arc;

use crate::config::AppConfig;
use crate::session::SessionService;
use crate::store::{SessionStore, UserStore};

pub struct GlobalState {
    pub config: AppConfig,
    pub ctx: common::context::Context,
    pub sessions: SessionService,
    pub user_store: Arc<dyn UserStore>,
}

impl GlobalState {
    pub fn new(
        config: AppConfig,
        ctx: common::context::Context,
        session_store: Arc<dyn SessionStore>,
        user_store: Arc<dyn UserStore>,
    ) -> Self {
        let sessions = SessionService::new(session_store, user_store.clone(), config.session.ttl());

        Self {
            config,
            ctx,
            sessions,
            user_store,
        }
    }
}
