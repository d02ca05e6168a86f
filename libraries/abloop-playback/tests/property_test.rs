//! Property-based tests for speed and loop invariants

mod common;

use abloop_playback::{LoopRegion, LoopStage, SpeedDirection, SpeedFactor, TickOutcome};
use common::{TestSession, LONG_TRACK};
use proptest::prelude::*;

const LONG_DURATION: u64 = 180_000;
const END_GUARD: u64 = 250;

fn direction() -> impl Strategy<Value = SpeedDirection> {
    prop_oneof![Just(SpeedDirection::Faster), Just(SpeedDirection::Slower)]
}

proptest! {
    /// Property: no sequence of steps leaves 0.20 < speed < 2.50
    #[test]
    fn speed_stays_in_range(steps in prop::collection::vec(direction(), 0..200)) {
        let mut speed = SpeedFactor::default();
        for step in steps {
            let next = speed.step(step);
            prop_assert!(next.percent() > 20 && next.percent() < 250);
            prop_assert_eq!(next.percent() % 5, 0);

            let moved = next.percent().abs_diff(speed.percent());
            prop_assert!(moved == 0 || moved == 5);
            speed = next;
        }
    }

    /// Property: an armed region is ordered and ends before the guard
    #[test]
    fn armed_region_respects_invariants(
        a in 0u64..=LONG_DURATION,
        b in 0u64..=LONG_DURATION,
    ) {
        let region = LoopRegion::armed_between(a, b, LONG_DURATION, END_GUARD);

        prop_assert!(region.armed);
        prop_assert!(region.start_ms <= region.end_ms);
        prop_assert!(region.end_ms <= LONG_DURATION - END_GUARD);
    }

    /// Property: any sequence of loop presses keeps the invariants and cycles stages
    #[test]
    fn loop_presses_keep_invariants(
        positions in prop::collection::vec(0u64..=LONG_DURATION, 1..30)
    ) {
        let mut test = TestSession::loaded(LONG_TRACK);
        let mut expected = LoopStage::Idle;

        for position in positions {
            test.session.seek_to(position).unwrap();
            let update = test.session.set_loop().unwrap();

            expected = match expected {
                LoopStage::Idle => LoopStage::StartCaptured,
                LoopStage::StartCaptured => LoopStage::Armed,
                _ => LoopStage::Idle,
            };
            prop_assert_eq!(update.stage, expected);
            prop_assert_eq!(update.region.armed, expected == LoopStage::Armed);

            if update.region.armed {
                prop_assert!(update.region.start_ms <= update.region.end_ms);
                prop_assert!(update.region.end_ms <= LONG_DURATION - END_GUARD);
            }
        }
    }

    /// Property: while an armed loop plays, a tick never leaves the position past the loop end
    #[test]
    fn ticks_keep_position_inside_armed_loop(
        a in 0u64..LONG_DURATION,
        b in 0u64..LONG_DURATION,
        advances in prop::collection::vec(1u64..20_000, 1..20),
    ) {
        let mut test = TestSession::loaded(LONG_TRACK);
        test.capture_at(a);
        test.capture_at(b);
        let region = test.session.loop_controller().region();

        test.session.seek_to(region.start_ms).unwrap();
        test.session.play().unwrap();

        for advance in advances {
            test.primitive().advance(advance);
            let outcome = test.session.on_tick();

            if let TickOutcome::LoopedBack { to_ms, .. } = outcome {
                prop_assert_eq!(to_ms, region.start_ms);
            }
            let position = test.session.engine().position_ms().unwrap();
            prop_assert!(position < region.end_ms || position == region.start_ms);
        }
    }
}
