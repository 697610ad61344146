//! End-to-end job flow through the public API: request in, ordered
//! reports out, with mock drivers standing in for a real browser.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use meeple_engine::driver::mock::MockDriver;
use meeple_engine::sequence::ScriptedAction;
use meeple_engine::{
    run_job, BrowserDriver, DriverFactory, EngineConfig, EngineError, GlobalStats, JobRequest,
    LaunchOptions, NullClock, SequenceSpec, SessionStatus,
};

struct MockFactory;

#[async_trait]
impl DriverFactory for MockFactory {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Arc<dyn BrowserDriver>, EngineError> {
        let mock = MockDriver::new("https://shop.example.com");
        // Scripted steps resolve their selectors against these rules
        mock.stage_eval("!!document.querySelector", json!(true));
        mock.stage_eval(
            "scrollIntoView",
            json!({ "found": true, "x": 40.0, "y": 60.0, "width": 180.0, "height": 44.0 }),
        );
        Ok(Arc::new(mock))
    }
}

fn checkout_sequence() -> SequenceSpec {
    SequenceSpec {
        description: "browse and start checkout".to_string(),
        temperature: 10.0,
        chaos_range: [10.0, 10.0],
        actions: vec![
            ScriptedAction {
                kind: "click".to_string(),
                selector: Some(".product-card".to_string()),
                text: None,
                value: None,
            },
            ScriptedAction {
                kind: "type".to_string(),
                selector: Some("#search".to_string()),
                text: Some("blue shoes".to_string()),
                value: None,
            },
            ScriptedAction {
                kind: "wait".to_string(),
                selector: None,
                text: None,
                value: None,
            },
            ScriptedAction {
                kind: "click".to_string(),
                selector: Some("#add-to-cart".to_string()),
                text: None,
                value: None,
            },
        ],
    }
}

#[tokio::test]
async fn persona_job_returns_ordered_complete_reports() {
    let stats = Arc::new(GlobalStats::new());
    let request = JobRequest {
        users: 4,
        concurrency: 2,
        max_actions: Some(8),
        seed: Some(99),
        ..JobRequest::new("https://shop.example.com")
    };

    let outcome = run_job(
        Arc::new(MockFactory),
        Arc::new(NullClock),
        EngineConfig::default(),
        stats.clone(),
        request,
    )
    .await
    .unwrap();

    assert_eq!(outcome.reports.len(), 4);
    assert_eq!(outcome.summary.completed, 4);
    for report in &outcome.reports {
        assert_eq!(report.status, SessionStatus::Completed);
        assert!(report.persona.is_some());
        assert_eq!(report.action_sequence.as_ref().unwrap().len(), 8);
        assert_eq!(report.actions_completed, 8);
    }
    // Names are distinct, increasing in request order
    let numbers: Vec<u32> = outcome
        .reports
        .iter()
        .map(|r| r.user_name.trim_start_matches("Meeple-").parse().unwrap())
        .collect();
    assert!(numbers.windows(2).all(|w| w[1] > w[0]));

    let snap = stats.snapshot();
    assert_eq!(snap.sessions_completed, 4);
    assert_eq!(snap.actions_attempted, 32);
    assert_eq!(snap.active_sessions, 0);
}

#[tokio::test]
async fn scripted_job_follows_the_sequence_at_max_temperature() {
    let request = JobRequest {
        users: 2,
        concurrency: 2,
        sequences: Some(HashMap::from([(
            "checkout".to_string(),
            checkout_sequence(),
        )])),
        seed: Some(7),
        ..JobRequest::new("https://shop.example.com")
    };

    let outcome = run_job(
        Arc::new(MockFactory),
        Arc::new(NullClock),
        EngineConfig::default(),
        Arc::new(GlobalStats::new()),
        request,
    )
    .await
    .unwrap();

    assert_eq!(outcome.reports.len(), 2);
    for report in &outcome.reports {
        assert_eq!(report.sequence.as_deref(), Some("checkout"));
        let results = report.action_results.as_ref().unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.scripted && r.success));
        assert_eq!(report.status, SessionStatus::Completed);
    }

    // Serialized reports speak camelCase to the caller
    let wire = serde_json::to_value(&outcome.reports[0]).unwrap();
    assert!(wire.get("userName").is_some());
    assert!(wire.get("actionResults").is_some());
    assert!(wire.get("sessionId").is_some());
}
