//! Key layout inside the `__access` namespace.

use crate::domain::timelock::TimelockHandle;
use shared_types::{OperationId, Principal, RoleId};

pub(crate) const OWNER: &[u8] = b"owner";
pub(crate) const HALTED: &[u8] = b"halted";
pub(crate) const TIMELOCK_SEQ: &[u8] = b"timelock_seq";

const MEMBER_PREFIX: &[u8] = b"member/";
const ROLE_ADMIN_PREFIX: &[u8] = b"role_admin/";
const POLICY_PREFIX: &[u8] = b"policy/";
const TIMELOCK_PREFIX: &[u8] = b"timelock/";

fn prefixed(prefix: &[u8], name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + name.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(name.as_bytes());
    key
}

/// `member/<role>/` followed by the 20 principal bytes.
pub(crate) fn member_prefix(role: &RoleId) -> Vec<u8> {
    let mut key = prefixed(MEMBER_PREFIX, role.as_str());
    key.push(b'/');
    key
}

pub(crate) fn member(role: &RoleId, principal: &Principal) -> Vec<u8> {
    let mut key = member_prefix(role);
    key.extend_from_slice(principal.as_bytes());
    key
}

/// Recovers the principal from a membership key of `role`.
pub(crate) fn parse_member(role: &RoleId, key: &[u8]) -> Option<Principal> {
    let prefix = member_prefix(role);
    key.strip_prefix(prefix.as_slice())
        .and_then(Principal::from_slice)
}

pub(crate) fn role_admin(role: &RoleId) -> Vec<u8> {
    prefixed(ROLE_ADMIN_PREFIX, role.as_str())
}

pub(crate) fn policy(operation: &OperationId) -> Vec<u8> {
    prefixed(POLICY_PREFIX, operation.as_str())
}

pub(crate) fn timelock(handle: TimelockHandle) -> Vec<u8> {
    let mut key = TIMELOCK_PREFIX.to_vec();
    key.extend_from_slice(&handle.0.to_be_bytes());
    key
}
