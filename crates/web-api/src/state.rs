use std::sync::Arc;

use application::{
    ConnectionRegistry, GroupService, MessageService, PresenceBroadcaster, StatusService,
    UserService,
};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub message_service: Arc<MessageService>,
    pub status_service: Arc<StatusService>,
    pub group_service: Arc<GroupService>,
    pub registry: Arc<ConnectionRegistry>,
    pub presence: Arc<PresenceBroadcaster>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_service: Arc<UserService>,
        message_service: Arc<MessageService>,
        status_service: Arc<StatusService>,
        group_service: Arc<GroupService>,
        registry: Arc<ConnectionRegistry>,
        presence: Arc<PresenceBroadcaster>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            user_service,
            message_service,
            status_service,
            group_service,
            registry,
            presence,
            jwt_service,
        }
    }
}
