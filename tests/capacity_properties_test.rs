//! Property-based tests for the registration state machine
//!
//! Random sequences of join / approve / reject / remove are replayed against
//! in-memory stores. Whatever the sequence, the participant set must match the
//! ledger, the approved count must match the approved registrations, and with
//! capacity enforcement on no event may ever be over-approved.

mod helpers;

use proptest::prelude::*;
use VolunteerConnect::{config::ApprovalCapacityPolicy, models::RegistrationStatus, VolunteerConnectError};

use helpers::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Join(usize),
    Approve(usize),
    Reject(usize),
    Remove(usize),
}

const VOLUNTEERS: usize = 6;

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..VOLUNTEERS).prop_map(Op::Join),
        (0..VOLUNTEERS).prop_map(Op::Approve),
        (0..VOLUNTEERS).prop_map(Op::Reject),
        (0..VOLUNTEERS).prop_map(Op::Remove),
    ]
}

fn op_sequence_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..40)
}

/// Errors a well-formed but unlucky operation may legitimately produce
fn is_expected_refusal(error: &VolunteerConnectError) -> bool {
    matches!(
        error,
        VolunteerConnectError::AlreadyRegistered { .. }
            | VolunteerConnectError::EventFull { .. }
            | VolunteerConnectError::RegistrationNotFound { .. }
    )
}

async fn replay(ctx: &TestContext, max_participants: i32, ops: &[Op]) {
    let event = ctx.create_event(max_participants).await;

    for op in ops {
        let result = match *op {
            Op::Join(i) => ctx.join(&format!("v{}", i), event.id).await.map(|_| ()),
            Op::Approve(i) => ctx.approve(&format!("v{}", i), event.id).await,
            Op::Reject(i) => ctx
                .registration
                .reject_participant(&ctx.organizer, event.id, &format!("v{}", i))
                .await
                .map(|_| ()),
            Op::Remove(i) => ctx
                .registration
                .remove_participant(&ctx.organizer, event.id, &format!("v{}", i))
                .await,
        };

        if let Err(e) = result {
            assert!(is_expected_refusal(&e), "unexpected error for {:?}: {}", op, e);
        }
        ctx.assert_consistent(event.id).await;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Invariants hold after every step of any operation sequence
    #[test]
    fn prop_invariants_hold_for_any_sequence(
        max_participants in 0i32..4,
        ops in op_sequence_strategy(),
    ) {
        tokio_test::block_on(async {
            let ctx = TestContext::new();
            replay(&ctx, max_participants, &ops).await;
        });
    }

    /// Approving everyone who joined never admits more than the limit
    #[test]
    fn prop_never_more_approved_than_capacity(
        max_participants in 1i32..5,
        applicants in 0usize..12,
    ) {
        let approved = tokio_test::block_on(async {
            let ctx = TestContext::new();
            let event = ctx.create_event(max_participants).await;

            for user_id in volunteer_ids(applicants) {
                // joins after the event fills are refused
                if ctx.join(&user_id, event.id).await.is_ok() {
                    let _ = ctx.approve(&user_id, event.id).await;
                }
            }

            ctx.assert_consistent(event.id).await;
            ctx.event(event.id).await.approved_count
        });

        prop_assert_eq!(approved, (applicants as i32).min(max_participants));
    }

    /// Without approval enforcement the counters still follow the ledger
    #[test]
    fn prop_join_only_policy_keeps_counts_consistent(
        max_participants in 0i32..3,
        ops in op_sequence_strategy(),
    ) {
        tokio_test::block_on(async {
            let ctx = TestContext::with_policy(ApprovalCapacityPolicy::JoinOnly);
            replay(&ctx, max_participants, &ops).await;
        });
    }

    /// Approving twice in a row is the same as approving once
    #[test]
    fn prop_approve_is_idempotent(repeats in 1usize..5) {
        let (count, status) = tokio_test::block_on(async {
            let ctx = TestContext::new();
            let event = ctx.create_event(3).await;
            ctx.join("v0", event.id).await.unwrap();
            for _ in 0..repeats {
                ctx.approve("v0", event.id).await.unwrap();
            }
            let registration = ctx.registration.get_registration(event.id, "v0").await.unwrap().unwrap();
            (ctx.event(event.id).await.approved_count, registration.status)
        });

        prop_assert_eq!(count, 1);
        prop_assert_eq!(status, RegistrationStatus::Approved);
    }
}
