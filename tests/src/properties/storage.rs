//! Type stability of storage slots.

use proptest::prelude::*;
use shared_types::{Principal, U256};
use ur_01_storage_facade::SlotValue;

/// Any slot value, spread across every type tag.
pub fn arb_slot_value() -> impl Strategy<Value = SlotValue> {
    prop_oneof![
        any::<u64>().prop_map(|v| SlotValue::UInt(U256::from(v))),
        any::<i128>().prop_map(SlotValue::Int),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(SlotValue::Bytes),
        any::<[u8; 20]>().prop_map(|b| SlotValue::Address(Principal::new(b))),
        any::<bool>().prop_map(SlotValue::Bool),
        "[a-z0-9 ]{0,16}".prop_map(SlotValue::String),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ur_01_storage_facade::{Namespace, StorageError, StorageFacade};

    proptest! {
        /// A second write succeeds only under the first write's type, and a
        /// rejected write leaves the first value in place.
        #[test]
        fn test_slot_type_is_sticky(
            key in prop::collection::vec(any::<u8>(), 1..16),
            first in arb_slot_value(),
            second in arb_slot_value(),
        ) {
            let mut storage = StorageFacade::in_memory();
            let ns = Namespace::new("app");
            storage.set_typed(&ns, &key, &first).unwrap();

            let result = storage.set_typed(&ns, &key, &second);
            if first.type_tag() == second.type_tag() {
                prop_assert!(result.is_ok());
                prop_assert_eq!(storage.get_typed(&ns, &key).unwrap(), second);
            } else {
                let is_type_mismatch = matches!(result, Err(StorageError::TypeMismatch { .. }));
                prop_assert!(is_type_mismatch);
                prop_assert_eq!(storage.get_typed(&ns, &key).unwrap(), first);
            }
        }

        /// Deleting a slot does not release its type.
        #[test]
        fn test_type_survives_delete(
            first in arb_slot_value(),
            second in arb_slot_value(),
        ) {
            let mut storage = StorageFacade::in_memory();
            let ns = Namespace::new("app");
            storage.set_typed(&ns, b"slot", &first).unwrap();
            storage.delete(&ns, b"slot").unwrap();
            prop_assert!(!storage.contains(&ns, b"slot").unwrap());

            let result = storage.set_typed(&ns, b"slot", &second);
            prop_assert_eq!(result.is_ok(), first.type_tag() == second.type_tag());
        }

        /// Namespaces never alias, whatever the key.
        #[test]
        fn test_namespaces_are_isolated(
            key in prop::collection::vec(any::<u8>(), 1..16),
            a in arb_slot_value(),
            b in arb_slot_value(),
        ) {
            let mut storage = StorageFacade::in_memory();
            let left = Namespace::new("left");
            let right = Namespace::new("right");
            storage.set_typed(&left, &key, &a).unwrap();
            storage.set_typed(&right, &key, &b).unwrap();
            prop_assert_eq!(storage.get_typed(&left, &key).unwrap(), a);
            prop_assert_eq!(storage.get_typed(&right, &key).unwrap(), b);
        }
    }
}
