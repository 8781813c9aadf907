//! # Property Tests
//!
//! proptest invariants that must hold for any input, checked directly
//! against the component APIs:
//!
//! | Module | Invariant |
//! |--------|-----------|
//! | `storage` | a slot's type never changes, even across deletes |
//! | `atomicity` | failed transactions and guarded calls leave no trace |
//! | `access` | no principal gains a role or ownership it was not given |
//! | `timelock` | execution succeeds exactly inside the approved window |

pub mod access;
pub mod atomicity;
pub mod storage;
pub mod timelock;
