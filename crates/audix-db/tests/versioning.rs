//! Template versioning end to end: create, concurrent edits, restore, delete,
//! and persistence across reopen.

use std::sync::Arc;

use audix_core::activity::Activity;
use audix_core::entities::TemplateFields;
use audix_core::errors::ErrorKind;
use audix_db::blob::BlobStore;
use audix_db::service::AudixService;
use audix_db::updates::template::TemplateUpdateBuilder;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn memory_service() -> AudixService {
    AudixService::new_local(":memory:", BlobStore::in_memory())
        .await
        .unwrap()
}

#[tokio::test]
async fn concurrent_edits_from_same_version_yield_one_conflict() {
    let svc = Arc::new(memory_service().await);
    let tpl = svc
        .create_template(TemplateFields::new("Vendor review", "v1"), "alice")
        .await
        .unwrap();

    let edit = |content: &'static str, actor: &'static str| {
        let svc = Arc::clone(&svc);
        let id = tpl.id.clone();
        async move {
            svc.update_template(&id, 1, TemplateUpdateBuilder::new().content(content).build(), actor)
                .await
        }
    };
    let (first, second) = tokio::join!(edit("from alice", "alice"), edit("from bob", "bob"));

    let outcomes = [first, second];
    let ok = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Conflict))
        .count();
    assert_eq!((ok, conflicts), (1, 1));

    let versions = svc.list_versions(&tpl.id, None, None).await.unwrap();
    assert_eq!(versions.iter().map(|v| v.version).collect::<Vec<_>>(), vec![2, 1]);
    assert_eq!(svc.get_template(&tpl.id).await.unwrap().version, 2);
}

#[tokio::test]
async fn many_concurrent_edits_keep_versions_gap_free() {
    let svc = Arc::new(memory_service().await);
    let tpl = svc
        .create_template(TemplateFields::new("Busy", "v1"), "alice")
        .await
        .unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let svc = Arc::clone(&svc);
        let id = tpl.id.clone();
        handles.push(tokio::spawn(async move {
            // Retry on conflict the way a client would: re-read, re-apply.
            loop {
                let current = svc.get_template(&id).await.unwrap();
                let update = TemplateUpdateBuilder::new()
                    .content(format!("edit {n}"))
                    .build();
                match svc.update_template(&id, current.version, update, "worker").await {
                    Ok(updated) => return updated.version,
                    Err(e) if e.kind() == ErrorKind::Conflict => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let versions = svc.list_versions(&tpl.id, None, None).await.unwrap();
    let numbers: Vec<u32> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, (1..=9).rev().collect::<Vec<_>>());
    let live = svc.get_template(&tpl.id).await.unwrap();
    assert_eq!(live.version, 9);
    assert_eq!(live.fields, versions[0].fields);
}

#[tokio::test]
async fn restoring_first_version_appends_a_fourth() {
    let svc = memory_service().await;
    let tpl = svc
        .create_template(TemplateFields::new("Payroll review", "v1"), "alice")
        .await
        .unwrap();
    for (expected, content) in [(1, "v2"), (2, "v3")] {
        svc.update_template(
            &tpl.id,
            expected,
            TemplateUpdateBuilder::new().content(content).build(),
            "alice",
        )
        .await
        .unwrap();
    }

    let restored = svc.restore_template(&tpl.id, 1, Some(3), "bob").await.unwrap();
    assert_eq!(restored.restored_from, 1);
    assert_eq!(restored.current_version, 4);
    assert_eq!(restored.template.fields.content, "v1");

    let mut history = svc.list_versions(&tpl.id, None, None).await.unwrap();
    history.reverse();
    let versions: Vec<u32> = history.iter().map(|v| v.version).collect();
    let contents: Vec<&str> = history.iter().map(|v| v.fields.content.as_str()).collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
    assert_eq!(contents, vec!["v1", "v2", "v3", "v1"]);
}

#[tokio::test]
async fn restore_then_history_reads_back() {
    let svc = memory_service().await;
    let mut fields = TemplateFields::new("Access review", "step 1");
    fields.description = Some("quarterly".into());
    let tpl = svc.create_template(fields, "alice").await.unwrap();

    svc.update_template(
        &tpl.id,
        1,
        TemplateUpdateBuilder::new()
            .content("step 1\nstep 2")
            .description(None)
            .tags(["sox"])
            .build(),
        "bob",
    )
    .await
    .unwrap();

    let restored = svc.restore_template(&tpl.id, 1, Some(2), "carol").await.unwrap();
    assert_eq!(restored.current_version, 3);
    assert_eq!(restored.template.fields.description.as_deref(), Some("quarterly"));
    assert!(restored.template.fields.tags.is_empty());

    let history = svc.list_versions(&tpl.id, None, None).await.unwrap();
    let authors: Vec<&str> = history.iter().map(|v| v.changed_by.as_str()).collect();
    assert_eq!(authors, vec!["carol", "bob", "alice"]);

    let activity = svc.activity_for(&tpl.id).await.unwrap();
    assert!(matches!(
        activity.last().map(|e| &e.activity),
        Some(Activity::VersionRestored {
            restored_from: 1,
            new_version: 3,
            ..
        })
    ));
    assert_eq!(activity.len(), 3);
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("audix.db");
    let db_path = db_path.to_str().unwrap();
    let blob_root = dir.path().join("blobs");

    let id = {
        let svc = AudixService::new_local(db_path, BlobStore::local(&blob_root).unwrap())
            .await
            .unwrap();
        let tpl = svc
            .create_template(TemplateFields::new("Persisted", "v1"), "alice")
            .await
            .unwrap();
        svc.update_template(&tpl.id, 1, TemplateUpdateBuilder::new().content("v2").build(), "a")
            .await
            .unwrap();
        svc.delete_template(&tpl.id, "alice").await.unwrap();
        tpl.id
    };

    let svc = AudixService::new_local(db_path, BlobStore::local(&blob_root).unwrap())
        .await
        .unwrap();
    assert_eq!(
        svc.get_template(&id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    let history = svc.list_versions(&id, None, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].fields.content, "v2");
}
