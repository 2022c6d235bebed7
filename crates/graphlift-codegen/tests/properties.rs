//! Generative round trips over sequences of statement shapes.

mod common;

use common::{registry, scene};
use graphlift_codegen::{check_roundtrip, CodegenOptions};
use graphlift_lift::LiftConfig;
use proptest::prelude::*;

const SHAPES: [&[&str]; 6] = [
    &["print_text(self.game, \"a\")"],
    &["compute(self.game, 1)"],
    &["value = compute(self.game, 2)", "print_text(self.game, to_text(value))"],
    &[
        "if flag:",
        "    print_text(self.game, \"t\")",
        "else:",
        "    compute(self.game, 3)",
    ],
    &["for i in range(0, 2):", "    compute(self.game, i)", "    break"],
    &["match mode:", "    case 1:", "        print_text(self.game, \"one\")"],
];

proptest! {
    #[test]
    fn statement_sequences_round_trip(
        picks in prop::collection::vec(0usize..SHAPES.len(), 1..6)
    ) {
        let lines: Vec<&str> = picks.iter().flat_map(|i| SHAPES[*i].iter().copied()).collect();
        let source = scene(&[("start", &lines)]);
        let round_trip = check_roundtrip(
            &source,
            &registry(),
            &LiftConfig::default(),
            &CodegenOptions::default(),
        )
        .unwrap();
        prop_assert!(
            round_trip.is_idempotent(),
            "{}\n{}",
            round_trip.differences().join("\n"),
            round_trip.relowered
        );
    }
}
