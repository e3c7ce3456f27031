use std::sync::Arc;

use application::ChatHub;

use crate::Authenticator;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<ChatHub>,
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    pub fn new(hub: Arc<ChatHub>, authenticator: Arc<Authenticator>) -> Self {
        Self { hub, authenticator }
    }
}
