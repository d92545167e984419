// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::HarnessBuilder;
use fleet_core::session::meta;
use fleet_core::test_support::{pr_info, pr_session};
use fleet_core::{PrReview, ReviewDecision, ReviewState};

fn review(author: &str, state: ReviewState, at: u64) -> PrReview {
    PrReview {
        author: author.to_string(),
        state,
        submitted_at: at,
    }
}

#[yare::parameterized(
    empty              = { vec![], vec![], ReviewDecision::None },
    single_approval    = { vec![review("alice", ReviewState::Approved, 1)], vec![], ReviewDecision::Approved },
    changes_trump_all  = {
        vec![
            review("alice", ReviewState::Approved, 1),
            review("bob", ReviewState::ChangesRequested, 2),
        ],
        vec![],
        ReviewDecision::ChangesRequested
    },
    latest_per_author  = {
        vec![
            review("alice", ReviewState::ChangesRequested, 1),
            review("alice", ReviewState::Approved, 2),
        ],
        vec![],
        ReviewDecision::Approved
    },
    commented_pending  = {
        vec![
            review("alice", ReviewState::Approved, 1),
            review("bob", ReviewState::Commented, 2),
        ],
        vec![],
        ReviewDecision::Pending
    },
    untrusted_ignored  = {
        vec![review("random", ReviewState::ChangesRequested, 1)],
        vec!["alice"],
        ReviewDecision::None
    },
    trusted_only_folds = {
        vec![
            review("random", ReviewState::ChangesRequested, 1),
            review("alice", ReviewState::Approved, 2),
        ],
        vec!["alice"],
        ReviewDecision::Approved
    },
    dismissed_dropped  = {
        vec![review("alice", ReviewState::Dismissed, 1)],
        vec![],
        ReviewDecision::None
    },
)]
fn fold_cases(reviews: Vec<PrReview>, allowed: Vec<&str>, expected: ReviewDecision) {
    let allowed: Vec<String> = allowed.into_iter().map(str::to_string).collect();
    assert_eq!(fold_review_decision(&reviews, &allowed), expected);
}

fn adoption_harness() -> crate::test_helpers::Harness {
    HarnessBuilder::new()
        .config(|c| c.allowed_users = vec!["trusted-bot".to_string()])
        .build()
}

#[tokio::test]
async fn external_pr_from_trusted_author_is_adopted() {
    let h = adoption_harness();
    let mut pr = pr_info("app", 77);
    pr.author = Some("trusted-bot".to_string());
    h.scm.set_open_prs(vec![pr.clone()]);

    h.engine.scan_external_prs(&[]).await;

    // Sidecar written under the next free id.
    let doc = h.meta("app-1").await;
    assert_eq!(doc.get(meta::ADOPTED).map(String::as_str), Some("true"));
    assert_eq!(doc.get(meta::STATUS).map(String::as_str), Some("pr_open"));
    assert_eq!(doc.get(meta::PR), Some(&pr.url));
    assert_eq!(doc.get(meta::BRANCH), Some(&pr.branch));
}

#[tokio::test]
async fn untrusted_authors_are_ignored() {
    let h = adoption_harness();
    let mut pr = pr_info("app", 77);
    pr.author = Some("stranger".to_string());
    h.scm.set_open_prs(vec![pr]);

    h.engine.scan_external_prs(&[]).await;
    assert!(h.meta("app-1").await.is_empty());
}

#[tokio::test]
async fn tracked_prs_are_not_readopted() {
    let h = adoption_harness();
    let mut pr = pr_info("app", 12);
    pr.author = Some("trusted-bot".to_string());
    h.scm.set_open_prs(vec![pr]);

    let tracked = pr_session("app-1", "app", 12);
    h.engine.scan_external_prs(&[tracked]).await;

    // app-2 would be the adoption slot; nothing was written anywhere.
    assert!(h.meta("app-2").await.is_empty());
}

#[tokio::test]
async fn adoption_reserves_ids_after_existing_sessions() {
    let h = adoption_harness();
    let mut pr = pr_info("app", 77);
    pr.author = Some("trusted-bot".to_string());
    h.scm.set_open_prs(vec![pr]);

    let existing = pr_session("app-4", "app", 12);
    h.engine.scan_external_prs(&[existing]).await;

    assert!(h.meta("app-5").await.contains_key(meta::ADOPTED));
}

#[tokio::test]
async fn scan_skips_scms_without_listing_support() {
    let h = adoption_harness();
    // FakeScm reports no listing support until set_open_prs is called.
    h.engine.scan_external_prs(&[]).await;
    assert!(h.meta("app-1").await.is_empty());
}
