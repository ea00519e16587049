use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{GroupId, Timestamp, UserId};

/// 聊天群组。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub member_ids: Vec<UserId>,
    pub created_at: Timestamp,
}

impl Group {
    /// 创建群组。群名不能为空，成员至少两人且不重复。
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        mut member_ids: Vec<UserId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("group_name", "cannot be empty"));
        }
        member_ids.sort();
        member_ids.dedup();
        if member_ids.len() < 2 {
            return Err(DomainError::invalid_argument(
                "members",
                "at least 2 members are required",
            ));
        }
        Ok(Self {
            id,
            name,
            member_ids,
            created_at: now,
        })
    }

    pub fn has_member(&self, user_id: UserId) -> bool {
        self.member_ids.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn group_requires_two_distinct_members() {
        let member = UserId::from(Uuid::new_v4());
        let result = Group::new(
            GroupId::from(Uuid::new_v4()),
            "friends",
            vec![member, member],
            OffsetDateTime::now_utc(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn group_keeps_members() {
        let a = UserId::from(Uuid::new_v4());
        let b = UserId::from(Uuid::new_v4());
        let group = Group::new(
            GroupId::from(Uuid::new_v4()),
            "friends",
            vec![a, b],
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        assert!(group.has_member(a));
        assert!(group.has_member(b));
    }
}
