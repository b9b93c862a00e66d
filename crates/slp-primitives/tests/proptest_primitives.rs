use proptest::prelude::*;

use slp_primitives::hash::{sha256, sha256d};
use slp_primitives::Hash;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn display_hex_is_reversed_internal_order(bytes in prop::array::uniform32(any::<u8>())) {
        let h = Hash::new(bytes);
        let mut reversed = bytes;
        reversed.reverse();
        prop_assert_eq!(h.to_hex(), hex::encode(reversed));
        prop_assert_eq!(Hash::from_hex(&h.to_string()).unwrap(), h);
    }

    #[test]
    fn sha256d_is_sha256_twice(data in prop::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(sha256d(&data), sha256(&sha256(&data)));
    }

    #[test]
    fn wrong_length_hex_is_rejected(s in "[0-9a-f]{0,63}") {
        prop_assert!(Hash::from_hex(&s).is_err());
    }
}
