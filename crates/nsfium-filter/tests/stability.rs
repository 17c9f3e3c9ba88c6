use anyhow::Result;
use nsfium_filter::{Decimator, FilterError, design_filter};
use proptest::prelude::*;

fn spec_strategy() -> impl Strategy<Value = String> {
    (
        prop::bool::ANY,
        prop::bool::ANY,
        1u32..=10,
        20.0f64..8_000.0,
    )
        .prop_map(|(low, matched, order, corner)| {
            format!(
                "{}Bu{}{}/{:.1}",
                if low { "Lp" } else { "Hp" },
                if matched { "Z" } else { "" },
                order,
                corner
            )
        })
}

proptest! {
    #[test]
    fn designed_filters_stay_bounded(spec in spec_strategy(), seed in any::<u32>()) {
        let mut filter = design_filter(&spec, 48_000.0).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut x = seed;
        for _ in 0..4_000 {
            x = x.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let input = (x >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
            let y = filter.step(input);
            prop_assert!(y.is_finite());
            prop_assert!(y.abs() < 64.0, "{spec} diverged: {y}");
        }
    }
}

#[test]
fn lowpass_after_decimation_keeps_level() -> Result<()> {
    let mut decimator = Decimator::new(1_789_773.0, 48_000.0)?;
    let mut lowpass = design_filter("LpBuZ2/12000", 48_000.0)?;

    let input = vec![0.3f32; 60_000];
    let mut decimated = Vec::new();
    decimator.process(&input, &mut decimated);

    let last = decimated
        .iter()
        .map(|&s| lowpass.step(s))
        .last()
        .unwrap_or_default();
    assert!((last - 0.3).abs() < 1e-3, "{last}");
    Ok(())
}

#[test]
fn design_errors_are_reported() {
    assert!(matches!(
        design_filter("nonsense", 48_000.0),
        Err(FilterError::Syntax { .. })
    ));
}
