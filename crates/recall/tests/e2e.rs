// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the complete message path.
//!
//! Each test builds an isolated TestHarness with a temp SQLite database and
//! mock adapters. Tests are independent and order-insensitive.

use recall_agent::orchestrator::EXHAUSTED_REPLY;
use recall_agent::tools::buttons;
use recall_core::{InboundMessage, StorageAdapter};
use recall_test_utils::harness::{TEST_CHANNEL, TEST_OWNER, TEST_SENDER};
use recall_test_utils::mock_embedder::unit;
use recall_test_utils::mock_provider::last_user_text;
use recall_test_utils::{MockProvider, TestHarness};
use serde_json::json;

const LAKE: &str = "We swam in the lake at dawn with Sam";

/// Answer utility prompts with fixed labels.
fn script_labels(harness: &TestHarness, title: &str, category: &str) {
    let title = json!({"title": title, "summary": format!("About {title}.")}).to_string();
    let category = json!([category]).to_string();
    harness.provider.set_utility(move |req| {
        let text = last_user_text(req);
        Ok(if text.starts_with("Write a short title") {
            title.clone()
        } else if text.starts_with("Pick one category") {
            category.clone()
        } else if text.starts_with("Suggest up to") {
            json!(["swimming"]).to_string()
        } else {
            "Outdoor moments.".to_string()
        })
    });
}

/// Capture and save `content` in a single turn; returns the new memory id.
async fn save(harness: &TestHarness, content: &str) -> String {
    harness.provider.push_response(MockProvider::tool_calls(vec![
        ("start_memory_capture", json!({"initial_content": content})),
        ("finalize_memory", json!({})),
    ]));
    harness.provider.push_text("Saved it.");
    let reply = harness.send(content).await;
    harness.settle().await;
    reply.created_memory_id.expect("memory should be created")
}

async fn category_usage(harness: &TestHarness, name: &str) -> i64 {
    harness
        .storage
        .list_categories(TEST_OWNER)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == name)
        .map(|c| c.usage_count)
        .unwrap_or(0)
}

// ---- Capture flow ----

#[tokio::test]
async fn capture_preview_and_save_across_turns() {
    let harness = TestHarness::new().await.unwrap();
    script_labels(&harness, "Lake swim", "Outdoors");

    harness
        .provider
        .push_tool_call("start_memory_capture", json!({"initial_content": LAKE}));
    harness.provider.push_text("Lovely. Anything else?");
    let reply = harness.send(LAKE).await;
    assert_eq!(reply.text, "Lovely. Anything else?");
    assert!(reply.suggestions.iter().any(|s| s.payload == buttons::GENERATE_DRAFT));

    harness
        .provider
        .push_tool_call("add_to_memory_draft", json!({"content": "The water was cold."}));
    harness.provider.push_text("Added.");
    harness.send("The water was cold.").await;

    harness.provider.push_tool_call("generate_memory_draft", json!({}));
    harness.provider.push_text("Here is your draft.");
    let reply = harness.press(buttons::GENERATE_DRAFT).await;
    assert!(reply.suggestions.iter().any(|s| s.payload == buttons::SAVE));
    assert!(
        harness
            .provider
            .tool_requests()
            .iter()
            .any(|r| last_user_text(r).contains("[Button pressed: generate_draft]"))
    );

    harness.provider.push_tool_call("finalize_memory", json!({}));
    harness.provider.push_text("Saved!");
    let reply = harness.press(buttons::SAVE).await;
    harness.settle().await;

    let id = reply.created_memory_id.expect("saved memory id");
    let memory = harness
        .storage
        .get_memory(TEST_OWNER, &id)
        .await
        .unwrap()
        .expect("memory persisted");
    assert_eq!(memory.title, "Lake swim");
    assert!(memory.content.contains("lake at dawn"));
    assert!(memory.content.contains("water was cold"));
    assert!(memory.embedding.is_some());
    assert_eq!(category_usage(&harness, "Outdoors").await, 1);

    let session = harness
        .storage
        .latest_session(TEST_CHANNEL, TEST_SENDER)
        .await
        .unwrap()
        .unwrap();
    assert!(session.draft.is_empty());
    assert_eq!(session.last_saved_memory_id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn repeated_save_reports_the_existing_memory() {
    let harness = TestHarness::new().await.unwrap();
    let id = save(&harness, LAKE).await;

    harness.provider.push_tool_call("finalize_memory", json!({}));
    harness.provider.push_text("Already saved.");
    let reply = harness.press(buttons::SAVE).await;
    assert!(reply.created_memory_id.is_none());
    assert_eq!(reply.cited_memory_ids, vec![id]);

    let hits = harness
        .storage
        .search_keyword(TEST_OWNER, "lake dawn", 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn cancel_discards_the_draft() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .provider
        .push_tool_call("start_memory_capture", json!({"initial_content": LAKE}));
    harness.provider.push_text("Go on.");
    harness.send(LAKE).await;

    harness.provider.push_tool_call("cancel_memory_draft", json!({}));
    harness.provider.push_text("Dropped it.");
    let reply = harness.press(buttons::CANCEL).await;
    assert_eq!(reply.text, "Dropped it.");
    assert!(reply.suggestions.iter().any(|s| s.payload == buttons::START_CAPTURE));

    let session = harness
        .storage
        .latest_session(TEST_CHANNEL, TEST_SENDER)
        .await
        .unwrap()
        .unwrap();
    assert!(session.draft.is_empty());
}

// ---- Retrieval and management ----

#[tokio::test]
async fn search_cites_matching_memories() {
    let harness = TestHarness::new().await.unwrap();
    let dinner = "Dinner at grandma's with the cousins";
    harness.embedder.pin(LAKE, unit(1));
    harness.embedder.pin(dinner, unit(0));
    harness.embedder.pin("lake", unit(1));
    let id = save(&harness, LAKE).await;
    save(&harness, dinner).await;

    harness
        .provider
        .push_tool_call("search_memories", json!({"query": "lake"}));
    harness.provider.push_text("You swam at dawn.");
    let reply = harness.send("when did I go to the lake?").await;
    assert_eq!(reply.text, "You swam at dawn.");
    assert_eq!(reply.cited_memory_ids, vec![id]);
}

#[tokio::test]
async fn delete_hides_the_memory_and_releases_its_category() {
    let harness = TestHarness::new().await.unwrap();
    script_labels(&harness, "Lake swim", "Outdoors");
    let id = save(&harness, LAKE).await;
    assert_eq!(category_usage(&harness, "Outdoors").await, 1);

    harness
        .provider
        .push_tool_call("delete_memory", json!({"memory_id": id}));
    harness.provider.push_text("Deleted.");
    harness.send("delete that one").await;
    harness.settle().await;

    assert!(
        harness
            .storage
            .get_memory(TEST_OWNER, &id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(category_usage(&harness, "Outdoors").await, 0);
}

// ---- Tool loop ----

#[tokio::test]
async fn tool_loop_is_bounded() {
    let harness = TestHarness::builder()
        .with_max_tool_iterations(2)
        .build()
        .await
        .unwrap();
    for _ in 0..5 {
        harness
            .provider
            .push_tool_call("search_memories", json!({"query": "anything"}));
    }
    let reply = harness.send("loop forever").await;
    assert_eq!(reply.text, EXHAUSTED_REPLY);
    assert_eq!(harness.provider.pending_responses(), 3);
}

#[tokio::test]
async fn provider_outage_still_answers() {
    let harness = TestHarness::new().await.unwrap();
    harness.provider.set_failing(true);
    let reply = harness.send("hello?").await;
    assert!(!reply.text.is_empty());
    assert!(!reply.suggestions.is_empty());
}

// ---- Identity linking ----

#[tokio::test]
async fn unlinked_sender_links_with_a_code() {
    let harness = TestHarness::new().await.unwrap();
    let stranger = |text: &str| InboundMessage {
        channel: "sms".into(),
        sender_id: "+15550100".into(),
        text: text.into(),
        ..Default::default()
    };

    let reply = harness.route(stranger("hi there")).await;
    assert!(reply.text.contains("/link"));
    assert!(harness.provider.requests().is_empty());

    let reply = harness.route(stranger("/link NOPE1234")).await;
    assert!(reply.text.contains("invalid"));

    let code = harness.router.issue_link_code(TEST_OWNER).await.unwrap();
    assert_eq!(code.len(), 8);
    let reply = harness.route(stranger(&format!("/link {code}"))).await;
    assert!(reply.text.contains("linked"));

    let reply = harness
        .route(stranger(&format!("/link {}", code.to_lowercase())))
        .await;
    assert!(reply.text.contains("invalid"), "codes are single use");

    harness.provider.push_text("Welcome back.");
    let reply = harness.route(stranger("hello again")).await;
    assert_eq!(reply.text, "Welcome back.");
    let session = harness
        .storage
        .latest_session("sms", "+15550100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.owner_id, TEST_OWNER);
}

// ---- Sessions ----

#[tokio::test]
async fn session_persists_between_turns() {
    let harness = TestHarness::new().await.unwrap();
    harness.send("one").await;
    let first = harness
        .storage
        .latest_session(TEST_CHANNEL, TEST_SENDER)
        .await
        .unwrap()
        .unwrap();
    harness.send("two").await;
    let second = harness
        .storage
        .latest_session(TEST_CHANNEL, TEST_SENDER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.history.len(), 4);
}

#[tokio::test]
async fn expired_session_starts_fresh() {
    let mut config = recall_config::RecallConfig::default();
    config.session.ttl_secs = 0;
    let harness = TestHarness::builder()
        .with_config(config)
        .build()
        .await
        .unwrap();

    harness
        .provider
        .push_tool_call("start_memory_capture", json!({"initial_content": LAKE}));
    harness.provider.push_text("Go on.");
    harness.send(LAKE).await;
    let first = harness
        .storage
        .latest_session(TEST_CHANNEL, TEST_SENDER)
        .await
        .unwrap()
        .unwrap();
    assert!(!first.draft.is_empty());

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    harness.send("still there?").await;
    let second = harness
        .storage
        .latest_session(TEST_CHANNEL, TEST_SENDER)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(first.id, second.id);
    assert!(second.draft.is_empty());
}

#[tokio::test]
async fn same_identity_turns_run_in_order() {
    let harness = TestHarness::new().await.unwrap();
    harness.provider.push_text("first");
    harness.provider.push_text("second");
    let (a, b) = tokio::join!(harness.send("a"), harness.send("b"));
    let mut texts = vec![a.text, b.text];
    texts.sort();
    assert_eq!(texts, vec!["first", "second"]);

    let session = harness
        .storage
        .latest_session(TEST_CHANNEL, TEST_SENDER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.history.len(), 4);
    assert_eq!(harness.router.active_turns(), 0);
}
