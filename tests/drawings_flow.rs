mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, read_json, TestApp, ACTOR};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct DrawingDetail {
    drawing: DrawingInfo,
}

#[derive(Debug, Deserialize)]
struct DrawingInfo {
    id: Uuid,
    drawing_number: String,
    title: String,
    status: String,
    revision: String,
    discipline: String,
    current_version: bool,
    superseded_by: Option<Uuid>,
    supersedes: Option<Uuid>,
    checked_by: Option<String>,
    approved_by: Option<String>,
    issue_date: Option<String>,
    issued_for: Option<String>,
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct RevisionIssued {
    previous: DrawingInfo,
    current: DrawingInfo,
    revision: RevisionInfo,
}

#[derive(Debug, Deserialize)]
struct RevisionInfo {
    drawing_id: Uuid,
    revision: String,
    description: String,
    revised_by: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
}

#[derive(Deserialize)]
struct AccessLogInfo {
    actor: String,
    action: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

async fn create_drawing(
    app: &TestApp,
    project_id: Uuid,
    payload: serde_json::Value,
) -> Result<DrawingInfo> {
    let response = app
        .post_json(
            &format!("/api/projects/{project_id}/drawings"),
            &payload,
            Some(ACTOR),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let detail: DrawingDetail = read_json(response).await?;
    Ok(detail.drawing)
}

fn ground_floor_plan() -> serde_json::Value {
    json!({
        "title": "Ground Floor Plan",
        "drawing_type": "architectural",
        "discipline": "architecture",
        "drawn_by": "j.drafter",
        "checked_by": "k.checker",
        "file_ref": "blobs/gf-plan-a.pdf",
        "sheet_size": "A1",
        "scale": "1:100",
        "tags": ["level-0", "plan", "plan"]
    })
}

#[tokio::test]
async fn drawing_creation_and_revision_flow() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let project_id = app.insert_project("PROJ01").await?;

    let first = create_drawing(&app, project_id, ground_floor_plan()).await?;
    assert_eq!(first.drawing_number, "PROJ01-A-ARC-0001");
    assert_eq!(first.revision, "A");
    assert_eq!(first.status, "draft");
    assert!(first.current_version);
    assert!(first.supersedes.is_none());
    assert_eq!(first.tags, vec!["level-0".to_string(), "plan".to_string()]);

    let second = create_drawing(
        &app,
        project_id,
        json!({
            "drawing_type": "detail",
            "discipline": "architecture",
            "drawn_by": "j.drafter",
            "file_ref": "blobs/stair-detail.pdf"
        }),
    )
    .await?;
    assert_eq!(second.drawing_number, "PROJ01-A-DET-0002");
    assert_eq!(second.title, second.drawing_number);

    let revise = app
        .post_json(
            &format!("/api/drawings/{}/revisions", first.id),
            &json!({
                "revision": "B",
                "file_ref": "blobs/gf-plan-b.pdf",
                "changes_summary": "Moved core walls"
            }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(revise.status(), StatusCode::CREATED);
    let issued: RevisionIssued = read_json(revise).await?;

    assert_eq!(issued.previous.id, first.id);
    assert!(!issued.previous.current_version);
    assert_eq!(issued.previous.status, "superseded");
    assert_eq!(issued.previous.superseded_by, Some(issued.current.id));

    assert_ne!(issued.current.id, first.id);
    assert!(issued.current.current_version);
    assert_eq!(issued.current.supersedes, Some(first.id));
    assert_eq!(issued.current.drawing_number, first.drawing_number);
    assert_eq!(issued.current.revision, "B");
    assert_eq!(issued.current.status, "draft");
    assert!(issued.current.checked_by.is_none());
    assert!(issued.current.approved_by.is_none());

    assert_eq!(issued.revision.drawing_id, first.id);
    assert_eq!(issued.revision.revision, "B");
    assert_eq!(issued.revision.description, "Revision B");
    assert_eq!(issued.revision.revised_by, ACTOR);

    let ledger = app
        .get(&format!("/api/drawings/{}/revisions", issued.current.id), Some(ACTOR))
        .await?;
    assert_eq!(ledger.status(), StatusCode::OK);
    let ledger: Vec<RevisionInfo> = read_json(ledger).await?;
    let labels: Vec<&str> = ledger.iter().map(|row| row.revision.as_str()).collect();
    assert_eq!(labels, vec!["B", "A"]);
    assert_eq!(ledger[1].description, "Initial issue");
    assert_eq!(ledger[1].revised_by, "j.drafter");

    let lineage = app
        .get(&format!("/api/drawings/{}/lineage", first.id), Some(ACTOR))
        .await?;
    let lineage: Vec<DrawingInfo> = read_json(lineage).await?;
    let ids: Vec<Uuid> = lineage.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![first.id, issued.current.id]);
    assert_eq!(lineage.iter().filter(|row| row.current_version).count(), 1);

    let register = app
        .get(
            &format!("/api/projects/{project_id}/drawings?current_only=true"),
            Some(ACTOR),
        )
        .await?;
    let register: Vec<DrawingInfo> = read_json(register).await?;
    let numbers: Vec<(&str, &str)> = register
        .iter()
        .map(|row| (row.drawing_number.as_str(), row.revision.as_str()))
        .collect();
    assert_eq!(
        numbers,
        vec![("PROJ01-A-ARC-0001", "B"), ("PROJ01-A-DET-0002", "A")]
    );

    let everything = app
        .get(&format!("/api/projects/{project_id}/drawings"), Some(ACTOR))
        .await?;
    let everything: Vec<DrawingInfo> = read_json(everything).await?;
    let revisions: Vec<&str> = everything
        .iter()
        .filter(|row| row.drawing_number == "PROJ01-A-ARC-0001")
        .map(|row| row.revision.as_str())
        .collect();
    assert_eq!(revisions, vec!["B", "A"]);
    assert!(everything.iter().all(|row| row.discipline == "architecture"));

    let by_type = app
        .get(
            &format!("/api/projects/{project_id}/drawings?type=detail"),
            Some(ACTOR),
        )
        .await?;
    let by_type: Vec<DrawingInfo> = read_json(by_type).await?;
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].id, second.id);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn revision_conflicts_are_rejected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let project_id = app.insert_project("PROJ02").await?;
    let first = create_drawing(&app, project_id, ground_floor_plan()).await?;

    let duplicate_initial = app
        .post_json(
            &format!("/api/drawings/{}/revisions", first.id),
            &json!({ "revision": "A", "file_ref": "blobs/again.pdf" }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(duplicate_initial.status(), StatusCode::CONFLICT);
    let error: ErrorBody = read_json(duplicate_initial).await?;
    assert_eq!(error.code, "conflict");

    let issued = app
        .post_json(
            &format!("/api/drawings/{}/revisions", first.id),
            &json!({ "revision": "B", "file_ref": "blobs/b.pdf" }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(issued.status(), StatusCode::CREATED);
    let issued: RevisionIssued = read_json(issued).await?;

    let fork = app
        .post_json(
            &format!("/api/drawings/{}/revisions", first.id),
            &json!({ "revision": "C", "file_ref": "blobs/c.pdf" }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(fork.status(), StatusCode::CONFLICT);

    let reused_label = app
        .post_json(
            &format!("/api/drawings/{}/revisions", issued.current.id),
            &json!({ "revision": "A", "file_ref": "blobs/a2.pdf" }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(reused_label.status(), StatusCode::CONFLICT);

    let missing_file = app
        .post_json(
            &format!("/api/drawings/{}/revisions", issued.current.id),
            &json!({ "revision": "C" }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(missing_file.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .post_json(
            &format!("/api/drawings/{}/revisions", Uuid::new_v4()),
            &json!({ "revision": "C", "file_ref": "blobs/c.pdf" }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let lineage = app
        .get(&format!("/api/drawings/{}/lineage", first.id), Some(ACTOR))
        .await?;
    let lineage: Vec<DrawingInfo> = read_json(lineage).await?;
    assert_eq!(lineage.len(), 2);
    assert_eq!(lineage.iter().filter(|row| row.current_version).count(), 1);
    assert_eq!(app.count_rows("drawing_revisions").await?, 2);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn creation_validation_and_duplicate_numbers() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let project_id = app.insert_project("PROJ03").await?;

    let missing_discipline = app
        .post_json(
            &format!("/api/projects/{project_id}/drawings"),
            &json!({
                "drawing_type": "structural",
                "drawn_by": "j.drafter",
                "file_ref": "blobs/x.pdf"
            }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(missing_discipline.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = read_json(missing_discipline).await?;
    assert_eq!(error.code, "validation");

    let unknown_type = app
        .post_json(
            &format!("/api/projects/{project_id}/drawings"),
            &json!({
                "drawing_type": "sculpture",
                "discipline": "structure",
                "drawn_by": "j.drafter",
                "file_ref": "blobs/x.pdf"
            }),
            Some(ACTOR),
        )
        .await?;
    assert!(unknown_type.status().is_client_error());

    let no_actor = app
        .post_json(
            &format!("/api/projects/{project_id}/drawings"),
            &ground_floor_plan(),
            None,
        )
        .await?;
    assert_eq!(no_actor.status(), StatusCode::BAD_REQUEST);

    let unknown_project = app
        .post_json(
            &format!("/api/projects/{}/drawings", Uuid::new_v4()),
            &ground_floor_plan(),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(unknown_project.status(), StatusCode::NOT_FOUND);

    let mut imported = ground_floor_plan();
    imported["drawing_number"] = json!("PROJ03-A-ARC-0001");
    let created = create_drawing(&app, project_id, imported.clone()).await?;
    assert_eq!(created.drawing_number, "PROJ03-A-ARC-0001");

    let duplicate = app
        .post_json(
            &format!("/api/projects/{project_id}/drawings"),
            &imported,
            Some(ACTOR),
        )
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let allocated = create_drawing(&app, project_id, ground_floor_plan()).await?;
    assert_eq!(allocated.drawing_number, "PROJ03-A-ARC-0002");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn revised_imports_do_not_consume_ordinals() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let project_id = app.insert_project("PROJ08").await?;

    let mut imported = ground_floor_plan();
    imported["drawing_number"] = json!("PROJ08-A-ARC-0001");
    let mut current = create_drawing(&app, project_id, imported).await?.id;
    for label in ["B", "C"] {
        let revised = app
            .post_json(
                &format!("/api/drawings/{current}/revisions"),
                &json!({ "revision": label, "file_ref": format!("blobs/gf-{label}.pdf") }),
                Some(ACTOR),
            )
            .await?;
        assert_eq!(revised.status(), StatusCode::CREATED);
        let revised: RevisionIssued = read_json(revised).await?;
        assert_eq!(revised.current.drawing_number, "PROJ08-A-ARC-0001");
        current = revised.current.id;
    }
    assert_eq!(app.count_rows("drawings").await?, 3);

    let allocated = create_drawing(&app, project_id, ground_floor_plan()).await?;
    assert_eq!(allocated.drawing_number, "PROJ08-A-ARC-0002");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn oversized_fields_are_rejected_before_writing() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let project_id = app.insert_project("PROJ07").await?;

    let mut wide_sheet = ground_floor_plan();
    wide_sheet["sheet_size"] = json!("A0 extended landscape");
    let rejected = app
        .post_json(
            &format!("/api/projects/{project_id}/drawings"),
            &wide_sheet,
            Some(ACTOR),
        )
        .await?;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = read_json(rejected).await?;
    assert_eq!(error.code, "validation");

    let mut long_grid = ground_floor_plan();
    long_grid["grid_reference"] = json!("C".repeat(65));
    let rejected = app
        .post_json(
            &format!("/api/projects/{project_id}/drawings"),
            &long_grid,
            Some(ACTOR),
        )
        .await?;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.count_rows("drawings").await?, 0);

    let drawing = create_drawing(&app, project_id, ground_floor_plan()).await?;
    let rejected = app
        .post_json(
            &format!("/api/drawings/{}/revisions", drawing.id),
            &json!({
                "revision": "B",
                "file_ref": "blobs/gf-plan-b.pdf",
                "approved_by": "p".repeat(129)
            }),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = read_json(rejected).await?;
    assert_eq!(error.code, "validation");
    assert_eq!(app.count_rows("drawings").await?, 1);

    let long_hop = format!("fe80::1%{}, 10.0.0.1", "eth".repeat(24));
    let created = app
        .post_json_forwarded_for(
            &format!("/api/projects/{project_id}/drawings"),
            &ground_floor_plan(),
            ACTOR,
            &long_hop,
        )
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: DrawingDetail = read_json(created).await?;
    let log = app
        .get(
            &format!("/api/drawings/{}/access-log", created.drawing.id),
            Some(ACTOR),
        )
        .await?;
    let log: Vec<AccessLogInfo> = read_json(log).await?;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "created");
    assert_eq!(log[0].ip_address, None);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn status_changes_stamp_approval_fields() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let project_id = app.insert_project("PROJ04").await?;
    let drawing = create_drawing(&app, project_id, ground_floor_plan()).await?;
    let path = format!("/api/drawings/{}/status", drawing.id);

    let approved = app
        .patch_json(&path, &json!({ "status": "approved" }), Some("principal"))
        .await?;
    assert_eq!(approved.status(), StatusCode::OK);
    let approved: DrawingDetail = read_json(approved).await?;
    assert_eq!(approved.drawing.status, "approved");
    assert_eq!(approved.drawing.approved_by.as_deref(), Some("principal"));
    assert!(approved.drawing.issue_date.is_some());

    let construction = app
        .patch_json(&path, &json!({ "status": "for_construction" }), Some(ACTOR))
        .await?;
    let construction: DrawingDetail = read_json(construction).await?;
    assert_eq!(construction.drawing.status, "for_construction");
    assert_eq!(construction.drawing.issued_for.as_deref(), Some("Construction"));
    assert_eq!(construction.drawing.approved_by.as_deref(), Some("principal"));

    let back_to_draft = app
        .patch_json(&path, &json!({ "status": "draft" }), Some(ACTOR))
        .await?;
    assert_eq!(back_to_draft.status(), StatusCode::OK);

    let manual_supersede = app
        .patch_json(&path, &json!({ "status": "superseded" }), Some(ACTOR))
        .await?;
    assert_eq!(manual_supersede.status(), StatusCode::BAD_REQUEST);

    let log = app
        .get(&format!("/api/drawings/{}/access-log", drawing.id), Some(ACTOR))
        .await?;
    let log: Vec<AccessLogInfo> = read_json(log).await?;
    let actions: Vec<&str> = log.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "status_changed_to_draft",
            "status_changed_to_for_construction",
            "status_changed_to_approved",
            "created",
        ]
    );
    assert_eq!(log[2].actor, "principal");
    assert_eq!(log[0].ip_address.as_deref(), Some("10.1.2.3"));
    assert_eq!(log[0].user_agent.as_deref(), Some("register-tests/1.0"));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn search_view_and_soft_delete() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let project_id = app.insert_project("PROJ05").await?;
    let plan = create_drawing(&app, project_id, ground_floor_plan()).await?;
    let beam = create_drawing(
        &app,
        project_id,
        json!({
            "title": "Transfer Beam Schedule",
            "description": "Beams at level 2 (100% loads)",
            "drawing_type": "schedule",
            "discipline": "structure",
            "drawn_by": "s.engineer",
            "file_ref": "blobs/beams.pdf",
            "tags": ["steel"]
        }),
    )
    .await?;

    let by_title = app
        .get(
            &format!("/api/projects/{project_id}/drawings/search?q=floor"),
            Some(ACTOR),
        )
        .await?;
    let by_title: Vec<DrawingInfo> = read_json(by_title).await?;
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].id, plan.id);

    let by_tag = app
        .get(
            &format!("/api/projects/{project_id}/drawings/search?q=steel"),
            Some(ACTOR),
        )
        .await?;
    let by_tag: Vec<DrawingInfo> = read_json(by_tag).await?;
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, beam.id);

    let literal_percent = app
        .get(
            &format!("/api/projects/{project_id}/drawings/search?q=100%25"),
            Some(ACTOR),
        )
        .await?;
    let literal_percent: Vec<DrawingInfo> = read_json(literal_percent).await?;
    assert_eq!(literal_percent.len(), 1);
    assert_eq!(literal_percent[0].id, beam.id);

    let empty = app
        .get(
            &format!("/api/projects/{project_id}/drawings/search?q=%20"),
            Some(ACTOR),
        )
        .await?;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let viewed = app
        .get(&format!("/api/drawings/{}", plan.id), Some("site-engineer"))
        .await?;
    assert_eq!(viewed.status(), StatusCode::OK);

    let deleted = app
        .delete(&format!("/api/drawings/{}", plan.id), Some(ACTOR))
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let deleted_again = app
        .delete(&format!("/api/drawings/{}", plan.id), Some(ACTOR))
        .await?;
    assert_eq!(deleted_again.status(), StatusCode::NO_CONTENT);

    let obsolete = app
        .get(
            &format!("/api/projects/{project_id}/drawings?status=obsolete"),
            Some(ACTOR),
        )
        .await?;
    let obsolete: Vec<DrawingInfo> = read_json(obsolete).await?;
    assert_eq!(obsolete.len(), 1);
    assert_eq!(obsolete[0].id, plan.id);

    let log = app
        .get(&format!("/api/drawings/{}/access-log", plan.id), Some(ACTOR))
        .await?;
    let log: Vec<AccessLogInfo> = read_json(log).await?;
    let actions: Vec<&str> = log.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(actions, vec!["deleted", "viewed", "created"]);
    assert_eq!(log[1].actor, "site-engineer");

    let missing = app
        .get(&format!("/api/drawings/{}", Uuid::new_v4()), Some(ACTOR))
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}
