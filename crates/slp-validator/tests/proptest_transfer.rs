use proptest::prelude::*;

use slp_primitives::Hash;
use slp_script::{TokenId, TokenType};
use slp_validator::validator::{Contribution, FungibleValidator, InputInfo, ValidatorRules, Verdict};
use slp_validator::Validity;

fn validator() -> FungibleValidator {
    FungibleValidator::new(TokenId::new(Hash::new([0x42; 32])), TokenType::Fungible)
}

fn decided_validity() -> impl Strategy<Value = Validity> {
    prop_oneof![
        Just(Validity::Valid),
        Just(Validity::Malformed),
        Just(Validity::InsufficientInputs),
        Just(Validity::BadNftParent),
    ]
}

fn any_validity() -> impl Strategy<Value = Validity> {
    prop_oneof![Just(Validity::Unknown), decided_validity()]
}

fn decided_inputs() -> impl Strategy<Value = Vec<InputInfo>> {
    prop::collection::vec(
        (decided_validity(), any::<u64>()).prop_map(|(validity, amount)| InputInfo { validity, amount: Some(amount) }),
        0..8,
    )
}

fn partial_inputs() -> impl Strategy<Value = Vec<InputInfo>> {
    prop::collection::vec(
        (any_validity(), prop::option::of(any::<u64>()))
            .prop_map(|(validity, amount)| InputInfo { validity, amount }),
        0..8,
    )
}

fn sum_where(inputs: &[InputInfo], keep: impl Fn(&InputInfo) -> bool) -> u128 {
    inputs.iter().filter(|i| keep(i)).map(|i| i.amount.unwrap_or(0) as u128).sum()
}

fn required_strategy() -> impl Strategy<Value = u128> {
    // sums of up to 19 u64 outputs
    prop_oneof![0u128..5000, 0u128..=(u64::MAX as u128) * 19]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn fully_known_send_is_valid_iff_valid_inputs_cover(
        inputs in decided_inputs(),
        required in required_strategy(),
    ) {
        let verdict = validator().validate(&Contribution::Send(required), &inputs);
        let valid_sum = sum_where(&inputs, |i| i.validity.is_valid());
        if valid_sum >= required {
            prop_assert_eq!(verdict, Verdict::Decided(Validity::Valid));
        } else {
            prop_assert_eq!(verdict, Verdict::Decided(Validity::InsufficientInputs));
        }
    }

    #[test]
    fn partial_send_never_decides_against_the_evidence(
        inputs in partial_inputs(),
        required in required_strategy(),
    ) {
        let verdict = validator().validate(&Contribution::Send(required), &inputs);
        match verdict {
            Verdict::Decided(Validity::Valid) => {
                prop_assert!(sum_where(&inputs, |i| i.validity.is_valid()) >= required);
            }
            Verdict::Decided(Validity::InsufficientInputs) => {
                // only with every amount known, and even the best case short
                prop_assert!(inputs.iter().all(|i| i.amount.is_some()));
                prop_assert!(sum_where(&inputs, |i| !i.validity.is_invalid()) < required);
            }
            Verdict::Undecided => {
                prop_assert!(sum_where(&inputs, |i| i.validity.is_valid()) < required);
            }
            other => prop_assert!(false, "unexpected verdict {:?}", other),
        }
    }
}
