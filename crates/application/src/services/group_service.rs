use std::sync::Arc;

use domain::{DomainError, Group, GroupId, UserId};
use uuid::Uuid;

use crate::{clock::Clock, error::ApplicationError, repository::{GroupRepository, UserRepository}};

#[derive(Debug, Clone)]
pub struct CreateGroupRequest {
    pub name: String,
    pub member_ids: Vec<Uuid>,
}

pub struct GroupServiceDependencies {
    pub group_repository: Arc<dyn GroupRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct GroupService {
    deps: GroupServiceDependencies,
}

impl GroupService {
    pub fn new(deps: GroupServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_group(&self, request: CreateGroupRequest) -> Result<Group, ApplicationError> {
        let member_ids: Vec<UserId> = request.member_ids.into_iter().map(UserId::from).collect();

        // 所有成员必须是已注册用户
        for member_id in &member_ids {
            if self
                .deps
                .user_repository
                .find_by_id(*member_id)
                .await?
                .is_none()
            {
                return Err(
                    DomainError::invalid_argument("members", "some members do not exist").into(),
                );
            }
        }

        let group = Group::new(
            GroupId::from(Uuid::new_v4()),
            request.name,
            member_ids,
            self.deps.clock.now(),
        )?;

        let stored = self.deps.group_repository.create(group).await?;
        Ok(stored)
    }

    pub async fn my_groups(&self, user_id: Uuid) -> Result<Vec<Group>, ApplicationError> {
        let groups = self
            .deps
            .group_repository
            .list_for_member(UserId::from(user_id))
            .await?;
        Ok(groups)
    }
}
