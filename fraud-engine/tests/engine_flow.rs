//! End-to-end flow through the fraud engine: submission, correlation,
//! registry hits and reviewer feedback.

use fraud_engine::{
    CardLimits, EngineConfig, ErrorKind, FraudEngine, InMemoryRegistry, InMemoryTransactionStore,
    RawTransaction, Verdict,
};
use std::sync::Arc;

const CARD: &str = "4000008449430003";
const OTHER_CARD: &str = "3151853279026036";

struct Harness {
    engine: Arc<FraudEngine>,
    registry: Arc<InMemoryRegistry>,
}

fn harness() -> Harness {
    let registry = Arc::new(InMemoryRegistry::new());
    let store = Arc::new(InMemoryTransactionStore::new());
    let engine = FraudEngine::new(EngineConfig::default(), registry.clone(), store).unwrap();
    Harness {
        engine: Arc::new(engine),
        registry,
    }
}

fn submission(amount: u64, ip: &str, number: &str, region: &str, date: &str) -> RawTransaction {
    RawTransaction::new(&amount.to_string(), ip, number, region, date)
}

#[tokio::test]
async fn test_default_limits_send_800_to_manual_review() {
    let h = harness();
    let evaluation = h
        .engine
        .evaluate(&submission(800, "127.0.0.1", CARD, "ECA", "2022-10-13T14:34:41"))
        .await
        .unwrap();

    assert_eq!(evaluation.transaction_id, 1);
    assert_eq!(evaluation.result, Verdict::ManualProcessing);
    assert_eq!(evaluation.info, "amount");
}

#[tokio::test]
async fn test_small_amount_allowed() {
    let h = harness();
    let evaluation = h
        .engine
        .evaluate(&submission(150, "127.0.0.1", CARD, "ECA", "2022-10-13T14:34:41"))
        .await
        .unwrap();

    assert_eq!(evaluation.result, Verdict::Allowed);
    assert_eq!(evaluation.info, "amount within limit");
}

#[tokio::test]
async fn test_three_regions_within_hour_prohibited() {
    let h = harness();
    let dates = ["2022-01-22T16:00:00", "2022-01-22T16:20:00", "2022-01-22T16:40:00"];
    let regions = ["EAP", "ECA", "HIC"];

    let mut last = None;
    for (region, date) in regions.iter().zip(dates) {
        last = Some(
            h.engine
                .evaluate(&submission(100, "192.168.1.1", CARD, region, date))
                .await
                .unwrap(),
        );
    }
    let last = last.unwrap();
    assert_eq!(last.result, Verdict::Prohibited);
    assert_eq!(last.info, "region-correlation");
}

#[tokio::test]
async fn test_two_ips_within_hour_review() {
    let h = harness();
    h.engine
        .evaluate(&submission(100, "10.0.0.1", CARD, "ECA", "2022-01-22T16:00:00"))
        .await
        .unwrap();
    let second = h
        .engine
        .evaluate(&submission(100, "10.0.0.2", CARD, "ECA", "2022-01-22T16:30:00"))
        .await
        .unwrap();
    assert_eq!(second.result, Verdict::ManualProcessing);
    assert_eq!(second.info, "ip-correlation");

    // Outside the window, the earlier IP no longer counts
    let later = h
        .engine
        .evaluate(&submission(100, "10.0.0.3", CARD, "ECA", "2022-01-22T18:00:00"))
        .await
        .unwrap();
    assert_eq!(later.result, Verdict::Allowed);
}

#[tokio::test]
async fn test_other_cards_do_not_correlate() {
    let h = harness();
    h.engine
        .evaluate(&submission(100, "10.0.0.1", OTHER_CARD, "EAP", "2022-01-22T16:00:00"))
        .await
        .unwrap();
    let evaluation = h
        .engine
        .evaluate(&submission(100, "10.0.0.2", CARD, "ECA", "2022-01-22T16:10:00"))
        .await
        .unwrap();
    assert_eq!(evaluation.result, Verdict::Allowed);
}

#[tokio::test]
async fn test_registry_hits_prohibit() {
    let h = harness();
    h.registry.add_stolen_card(OTHER_CARD).unwrap();
    h.registry.add_suspicious_ip("127.127.127.127").unwrap();

    let evaluation = h
        .engine
        .evaluate(&submission(100, "127.127.127.127", OTHER_CARD, "ECA", "2022-10-13T14:34:41"))
        .await
        .unwrap();
    assert_eq!(evaluation.result, Verdict::Prohibited);
    assert_eq!(evaluation.info, "card-number, ip");
}

#[tokio::test]
async fn test_feedback_adjusts_limits_for_that_card_only() {
    let h = harness();
    let evaluation = h
        .engine
        .evaluate(&submission(800, "127.0.0.1", CARD, "ECA", "2022-10-13T14:34:41"))
        .await
        .unwrap();

    let view = h
        .engine
        .correct(evaluation.transaction_id, "ALLOWED")
        .await
        .unwrap();
    assert_eq!(view.result, Verdict::ManualProcessing);
    assert_eq!(view.feedback, "ALLOWED");
    assert_eq!(view.date, "2022-10-13T14:34:41");

    assert_eq!(h.engine.card_limits(CARD).await.unwrap(), CardLimits::new(260, 1500));
    assert_eq!(h.engine.card_limits(OTHER_CARD).await.unwrap(), CardLimits::new(200, 1500));

    // 250 is now under the raised allow bound
    let next = h
        .engine
        .evaluate(&submission(250, "127.0.0.1", CARD, "ECA", "2022-10-13T14:40:00"))
        .await
        .unwrap();
    assert_eq!(next.result, Verdict::Allowed);
}

#[tokio::test]
async fn test_feedback_conflicts() {
    let h = harness();
    let evaluation = h
        .engine
        .evaluate(&submission(800, "127.0.0.1", CARD, "ECA", "2022-10-13T14:34:41"))
        .await
        .unwrap();
    let id = evaluation.transaction_id;

    let same = h.engine.correct(id, "MANUAL_PROCESSING").await.unwrap_err();
    assert_eq!(same.kind(), ErrorKind::Conflict);
    assert_eq!(h.engine.card_limits(CARD).await.unwrap(), CardLimits::new(200, 1500));

    h.engine.correct(id, "PROHIBITED").await.unwrap();
    let again = h.engine.correct(id, "ALLOWED").await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::Conflict);
    assert_eq!(h.engine.card_limits(CARD).await.unwrap(), CardLimits::new(200, 1430));
}

#[tokio::test]
async fn test_feedback_errors() {
    let h = harness();
    assert_eq!(
        h.engine.correct(42, "ALLOWED").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        h.engine.correct(42, "INVALID").await.unwrap_err().kind(),
        ErrorKind::Validation
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_feedback_applies_once() {
    let h = harness();
    let evaluation = h
        .engine
        .evaluate(&submission(800, "127.0.0.1", CARD, "ECA", "2022-10-13T14:34:41"))
        .await
        .unwrap();
    let id = evaluation.transaction_id;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = h.engine.clone();
        tasks.push(tokio::spawn(async move { engine.correct(id, "ALLOWED").await }));
    }

    let mut applied = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => applied += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(h.engine.card_limits(CARD).await.unwrap(), CardLimits::new(260, 1500));
}

#[tokio::test]
async fn test_card_history() {
    let h = harness();
    h.engine
        .evaluate(&submission(800, "127.0.0.1", CARD, "ECA", "2022-10-13T14:34:41"))
        .await
        .unwrap();
    h.engine
        .evaluate(&submission(100, "127.0.0.1", OTHER_CARD, "ECA", "2022-10-13T14:35:00"))
        .await
        .unwrap();

    let history = h.engine.card_history(CARD).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, 800);
    assert_eq!(history[0].feedback, "");

    assert_eq!(h.engine.list_transactions().await.unwrap().len(), 2);
    assert_eq!(
        h.engine.card_history("1234567891011121").await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        h.engine.card_history("4242424242424242").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
