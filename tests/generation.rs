//! End-to-end tests for the generation tool loop: scripted model in,
//! snapshot broadcasts out.

mod common;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

use common::scripted::ScriptedModel;
use common::{drain, snapshots};
use verdigris::agent::broadcast::DocumentMessage;
use verdigris::agent::project::ProjectState;
use verdigris::agent::tools::StepOutcome;
use verdigris::agent::{run_revision, GenerationRun, RunContext};
use verdigris::types::snapshot::PLACEHOLDER;
use verdigris::{ArtifactView, Broadcaster, GenerationConfig};

fn test_config() -> GenerationConfig {
    GenerationConfig::default().without_pacing()
}

#[tokio::test]
async fn test_initialize_then_write_scenario() {
    // initialize_project(["main.tf","plan.md"]) then stream plan.md:
    // plan.md grows monotonically while main.tf stays "Pending...".
    let model = ScriptedModel::new()
        .call("initialize_project", json!({"files": ["main.tf", "plan.md"]}))
        .call("write_file", json!({"filename": "plan.md"}))
        .content("plan.md", &["# Plan\n", "- vpc\n", "- subnets\n"]);

    let (broadcaster, mut rx) = Broadcaster::channel();
    let ctx = RunContext::new("a vpc with two subnets", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    let messages = drain(&mut rx);
    let snaps = snapshots(&messages);

    // After initialization both files are placeholders.
    let initialized = snaps
        .iter()
        .find(|s| s.files.len() == 2)
        .expect("initialization snapshot");
    assert_eq!(initialized.get("main.tf").unwrap().content, PLACEHOLDER);
    assert_eq!(initialized.get("plan.md").unwrap().content, PLACEHOLDER);

    // plan.md content grows monotonically; main.tf never leaves Pending.
    let mut previous = String::new();
    for snap in snaps.iter().filter(|s| {
        s.files.len() == 2 && s.get("plan.md").is_some_and(|f| f.content != PLACEHOLDER)
    }) {
        let content = &snap.get("plan.md").unwrap().content;
        assert!(
            content.starts_with(&previous),
            "content regressed: {previous:?} -> {content:?}"
        );
        previous = content.clone();
        assert_eq!(snap.get("main.tf").unwrap().content, PLACEHOLDER);
    }
    assert_eq!(previous, "# Plan\n- vpc\n- subnets\n");

    // The run's final content is the last broadcast.
    assert_eq!(
        outcome.content,
        messages
            .iter()
            .rev()
            .find_map(DocumentMessage::snapshot_json)
            .unwrap()
    );
    assert!(messages.last().unwrap().is_finish());
}

#[tokio::test]
async fn test_write_project_files_streams_sequentially() {
    let model = ScriptedModel::new()
        .call(
            "initialize_project",
            json!({"files": ["plan.md", "main.tf", "variables.tf"]}),
        )
        .call(
            "write_project_files",
            json!({"filenames": ["main.tf", "variables.tf"]}),
        )
        .content("main.tf", &["resource \"aws_vpc\" \"main\" {\n", "}\n"])
        .content("variables.tf", &["variable \"region\" {}\n"]);

    let (broadcaster, mut rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    let final_snap = outcome.state.snapshot();
    assert_eq!(
        final_snap.get("main.tf").unwrap().content,
        "resource \"aws_vpc\" \"main\" {\n}\n"
    );
    assert_eq!(
        final_snap.get("variables.tf").unwrap().content,
        "variable \"region\" {}\n"
    );
    // plan.md was announced but never written.
    assert_eq!(final_snap.get("plan.md").unwrap().content, PLACEHOLDER);

    // variables.tf must not receive content before main.tf finishes.
    let snaps = snapshots(&drain(&mut rx));
    let main_done = snaps
        .iter()
        .position(|s| {
            s.get("main.tf")
                .is_some_and(|f| f.content == "resource \"aws_vpc\" \"main\" {\n}\n")
        })
        .expect("main.tf completion");
    for snap in &snaps[..main_done] {
        if let Some(vars) = snap.get("variables.tf") {
            assert!(vars.content == PLACEHOLDER || vars.content.is_empty());
        }
    }

    let ack = outcome.transcript.last().unwrap().outcome.text().to_string();
    assert_eq!(
        ack,
        "Successfully wrote content for: main.tf, variables.tf"
    );
}

#[tokio::test]
async fn test_edit_miss_leaves_content_byte_identical() {
    let model = ScriptedModel::new()
        .call("initialize_project", json!({"files": ["main.tf"]}))
        .call("write_file", json!({"filename": "main.tf"}))
        .content("main.tf", &["resource \"aws_vpc\" \"main\" {}"])
        .call(
            "edit",
            json!({
                "filePath": "main.tf",
                "oldString": "not present anywhere",
                "newString": "x",
            }),
        );

    let (broadcaster, _rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    assert_eq!(
        outcome.state.content("main.tf"),
        Some("resource \"aws_vpc\" \"main\" {}")
    );
    let edit_step = outcome.transcript.last().unwrap();
    assert!(edit_step.outcome.is_failed());
    assert_eq!(edit_step.outcome.text(), "Error: String not found in main.tf.");
}

#[tokio::test]
async fn test_edit_replays_new_content() {
    let model = ScriptedModel::new()
        .call("initialize_project", json!({"files": ["main.tf"]}))
        .call("write_file", json!({"filename": "main.tf"}))
        .content("main.tf", &["cidr_block = \"10.0.0.0/16\""])
        .call(
            "edit",
            json!({
                "filePath": "main.tf",
                "oldString": "10.0.0.0/16",
                "newString": "10.1.0.0/16",
            }),
        );

    let (broadcaster, mut rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    assert_eq!(
        outcome.state.content("main.tf"),
        Some("cidr_block = \"10.1.0.0/16\"")
    );
    assert_eq!(
        outcome.transcript.last().unwrap().outcome.text(),
        "Successfully edited main.tf. Replaced 1 occurrence."
    );

    // Replay resets the file to empty, then rebuilds it.
    let snaps = snapshots(&drain(&mut rx));
    let emptied_after_write = snaps
        .iter()
        .skip_while(|s| {
            !s.get("main.tf")
                .is_some_and(|f| f.content == "cidr_block = \"10.0.0.0/16\"")
        })
        .any(|s| s.get("main.tf").is_some_and(|f| f.content.is_empty()));
    assert!(emptied_after_write, "edit should replay from empty");
}

#[tokio::test]
async fn test_multi_edit_applies_two_of_three() {
    let model = ScriptedModel::new()
        .call("initialize_project", json!({"files": ["main.tf"]}))
        .call("write_file", json!({"filename": "main.tf"}))
        .content("main.tf", &["alpha beta gamma"])
        .call(
            "multiEdit",
            json!({
                "filePath": "main.tf",
                "edits": [
                    {"oldString": "alpha", "newString": "one"},
                    // "alpha" is gone after edit #1, so this one skips.
                    {"oldString": "alpha", "newString": "two"},
                    {"oldString": "gamma", "newString": "three"},
                ]
            }),
        );

    let (broadcaster, _rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    assert_eq!(outcome.state.content("main.tf"), Some("one beta three"));
    assert_eq!(
        outcome.transcript.last().unwrap().outcome.text(),
        "Successfully applied 2 out of 3 edits to main.tf."
    );
}

#[tokio::test]
async fn test_stream_failure_ends_run_with_last_broadcast() {
    let model = ScriptedModel::new()
        .call("initialize_project", json!({"files": ["plan.md", "main.tf"]}))
        .call("write_file", json!({"filename": "plan.md"}))
        .content("plan.md", &["# Plan"])
        .call("write_file", json!({"filename": "main.tf"}))
        .failing_stream("main.tf")
        // Never reached: the run ends at the failed stream.
        .call("write_file", json!({"filename": "plan.md"}));

    let (broadcaster, mut rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    // Three steps executed: init, plan.md, and the failed main.tf.
    assert_eq!(outcome.transcript.len(), 3);
    assert!(outcome.transcript[2].outcome.is_failed());

    // plan.md content survives in the final broadcast.
    let messages = drain(&mut rx);
    let last = snapshots(&messages).pop().expect("final snapshot");
    assert_eq!(last.get("plan.md").unwrap().content, "# Plan");
    assert!(messages.last().unwrap().is_finish());
}

#[tokio::test]
async fn test_step_ceiling_terminates_run() {
    let model = ScriptedModel::new()
        .call("fetchFiles", json!({"files": ["main.tf"]}))
        .repeating_last_call();

    let (broadcaster, _rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let mut config = test_config();
    config.max_steps = 5;
    let outcome = GenerationRun::new(model, config, broadcaster).run(&ctx).await;
    assert_eq!(outcome.transcript.len(), 5);
}

#[tokio::test]
async fn test_unknown_tool_is_nonfatal() {
    let model = ScriptedModel::new()
        .call("provision_kubernetes", json!({}))
        .call("initialize_project", json!({"files": ["main.tf"]}));

    let (broadcaster, _rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    assert_eq!(outcome.transcript.len(), 2);
    assert!(outcome.transcript[0].outcome.is_failed());
    assert!(matches!(
        outcome.transcript[1].outcome,
        StepOutcome::Completed(_)
    ));
}

#[tokio::test]
async fn test_broadcast_stream_reconciles_to_final_state() {
    let model = ScriptedModel::new()
        .call("initialize_project", json!({"files": ["plan.md", "main.tf"]}))
        .call(
            "write_project_files",
            json!({"filenames": ["plan.md", "main.tf"]}),
        )
        .content("plan.md", &["# The plan, in detail\n"])
        .content("main.tf", &["resource \"aws_vpc\" \"main\" {}\n"]);

    let (broadcaster, mut rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let outcome = GenerationRun::new(model, test_config(), broadcaster)
        .run(&ctx)
        .await;

    let mut view = ArtifactView::new();
    view.pump(&mut rx);

    assert!(!view.is_generating());
    assert_eq!(view.document().map(|d| d.id), Some(ctx.id));
    assert_eq!(
        view.files().to_vec(),
        outcome.state.snapshot().files
    );
    // Every discovered file auto-opened, first file active.
    assert_eq!(view.open_files(), &["main.tf", "plan.md"]);
    assert_eq!(view.active_file(), Some("main.tf"));
}

#[tokio::test]
async fn test_revision_run_streams_prefixes() {
    let model = ScriptedModel::new().revision(&[
        r#"{"files":[{"title":"main.tf","#,
        r#""content":"resource \"aws_vpc\" \"main\" {}"}]}"#,
    ]);

    let (broadcaster, mut rx) = Broadcaster::channel();
    let ctx = RunContext::new("vpc", "terraform");
    let draft = run_revision(&model, &broadcaster, &ctx, "widen the cidr", "{}").await;

    // A reconciler fed the raw prefixes still tracks the file.
    let mut view = ArtifactView::new();
    view.pump(&mut rx);
    assert_eq!(view.files().len(), 1);
    assert_eq!(view.files()[0].title, "main.tf");

    // The draft is the complete accumulated document.
    assert!(verdigris::Snapshot::from_wire(&draft).is_ok());
}

proptest! {
    /// Any sequence of announce/write/edit/remove operations leaves the
    /// file map with unique titles, and removed paths stay gone unless
    /// re-announced.
    #[test]
    fn prop_tool_sequences_keep_titles_unique(
        ops in proptest::collection::vec(
            prop_oneof![
                (0usize..6).prop_map(Op::Announce),
                ((0usize..6), ".{0,20}").prop_map(|(i, s)| Op::Write(i, s)),
                (0usize..6).prop_map(Op::Remove),
            ],
            0..40,
        )
    ) {
        let titles = ["main.tf", "plan.md", "variables.tf", "outputs.tf",
                      "modules/vpc/main.tf", "modules/vpc/vars.tf"];
        let mut state = ProjectState::new();
        let mut expected: Vec<String> = Vec::new();

        for op in ops {
            match op {
                Op::Announce(i) => {
                    let title = titles[i].to_string();
                    state.ensure_files(std::slice::from_ref(&title));
                    if !expected.contains(&title) {
                        expected.push(title);
                    }
                }
                Op::Write(i, content) => {
                    let title = titles[i].to_string();
                    state.set_content(&title, &content);
                    if !expected.contains(&title) {
                        expected.push(title);
                    }
                }
                Op::Remove(i) => {
                    let removed = state.remove_path(titles[i]);
                    expected.retain(|t| !removed.contains(t));
                }
            }
        }

        let snapshot = state.snapshot();
        let mut seen = std::collections::HashSet::new();
        for file in &snapshot.files {
            prop_assert!(seen.insert(file.title.clone()), "duplicate title {}", file.title);
        }
        prop_assert_eq!(snapshot.titles(), expected);
    }
}

#[derive(Debug, Clone)]
enum Op {
    Announce(usize),
    Write(usize, String),
    Remove(usize),
}
