//! uid/gid lookup

use crate::error::{HostError, Result};

pub fn uid_of(user: &str) -> Result<u32> {
    uzers::get_user_by_name(user)
        .map(|u| u.uid())
        .ok_or_else(|| HostError::UnknownUser(user.to_string()))
}

pub fn gid_of(group: &str) -> Result<u32> {
    uzers::get_group_by_name(group)
        .map(|g| g.gid())
        .ok_or_else(|| HostError::UnknownGroup(group.to_string()))
}

pub fn user_exists(user: &str) -> bool {
    uzers::get_user_by_name(user).is_some()
}

pub fn group_exists(group: &str) -> bool {
    uzers::get_group_by_name(group).is_some()
}

pub fn current_uid() -> u32 {
    uzers::get_current_uid()
}
