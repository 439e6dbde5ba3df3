#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;

use common::{body_text, location, multipart_body, multipart_request, TestContext};
use securelog::entity::incident_report::{self, Severity, Status};
use securelog::entity::user::Role;
use securelog::entity::{incident_comment, incident_status_history};
use securelog::util::multipart::MAX_TEXT_FIELD_BYTES;

fn create_fields(type_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("title", "Forklift collision".to_string()),
        ("description", "Reversing forklift clipped a rack".to_string()),
        ("incident_type", type_id.to_string()),
        ("severity", "high".to_string()),
        ("location", "Dock 3".to_string()),
    ]
}

fn as_refs<'a>(fields: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

#[actix_web::test]
async fn reporter_creates_and_stranger_is_denied() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let bob = ctx.create_user("bob", Role::Regular).await;
    let type_id = ctx.incident_type_id().await.to_string();

    let fields = create_fields(&type_id);
    let body = multipart_body(&as_refs(&fields), None);
    let resp = test::call_service(&app, multipart_request("/incidents/create/", ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let created = incident_report::Entity::find()
        .one(&ctx.db)
        .await
        .unwrap()
        .expect("incident was not stored");
    assert_eq!(location(&resp), format!("/incidents/{}/", created.id));
    assert_eq!(created.reporter_id, alice.id);
    assert_eq!(created.status, Status::Open);
    assert_eq!(created.severity, Severity::High);
    assert_eq!(created.assignee_id, None);

    let req = test::TestRequest::get()
        .uri(&format!("/incidents/{}/", created.id))
        .cookie(ctx.session_cookie(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Forklift collision"));
    assert!(html.contains("Open"));

    for uri in [
        format!("/incidents/{}/", created.id),
        format!("/incidents/{}/edit/", created.id),
        format!("/incidents/{}/delete/", created.id),
    ] {
        let req = test::TestRequest::get().uri(&uri).cookie(ctx.session_cookie(&bob)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[actix_web::test]
async fn invalid_submission_rerenders_with_errors() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;

    let body = multipart_body(&[("title", ""), ("description", "Kept text"), ("severity", "apocalyptic")], None);
    let resp = test::call_service(&app, multipart_request("/incidents/create/", ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_text(resp).await;
    assert!(html.contains("This field is required."));
    assert!(html.contains("Select a valid choice."));
    assert!(html.contains("Kept text"));
    assert_eq!(incident_report::Entity::find().count(&ctx.db).await.unwrap(), 0);
}

#[actix_web::test]
async fn regular_users_cannot_assign() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let bob = ctx.create_user("bob", Role::Regular).await;
    let type_id = ctx.incident_type_id().await.to_string();

    let assignee = bob.id.to_string();
    let mut fields = create_fields(&type_id);
    fields.push(("assignee", assignee.clone()));
    let body = multipart_body(&as_refs(&fields), None);
    let resp = test::call_service(&app, multipart_request("/incidents/create/", ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let created = incident_report::Entity::find().one(&ctx.db).await.unwrap().unwrap();
    assert_eq!(created.assignee_id, None);
}

#[actix_web::test]
async fn assignee_can_view_but_not_modify() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let bob = ctx.create_user("bob", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Blocked exit", Severity::Medium, Status::Open, Some(bob.id)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/incidents/{}/", incident.id))
        .cookie(ctx.session_cookie(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/incidents/{}/status/", incident.id))
        .cookie(ctx.session_cookie(&bob))
        .set_form([("status", "closed")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.reload(incident.id).await.unwrap().status, Status::Open);
}

#[actix_web::test]
async fn edit_records_status_history_and_keeps_reporter() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Chemical spill", Severity::Low, Status::Open, None).await;
    let type_id = incident.incident_type_id.to_string();

    let body = multipart_body(
        &[
            ("title", "Chemical spill in lab 2"),
            ("description", "Contained with absorbent pads"),
            ("incident_type", type_id.as_str()),
            ("severity", "critical"),
            ("status", "in_progress"),
            ("status_change_reason", "Cleanup started"),
        ],
        None,
    );
    let uri = format!("/incidents/{}/edit/", incident.id);
    let resp = test::call_service(&app, multipart_request(&uri, ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/incidents/{}/", incident.id));

    let updated = ctx.reload(incident.id).await.unwrap();
    assert_eq!(updated.title, "Chemical spill in lab 2");
    assert_eq!(updated.severity, Severity::Critical);
    assert_eq!(updated.status, Status::InProgress);
    assert_eq!(updated.reporter_id, alice.id);
    assert!(updated.updated_at.is_some());

    let history = incident_status_history::Entity::find()
        .filter(incident_status_history::Column::IncidentId.eq(incident.id))
        .all(&ctx.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_status, Status::Open);
    assert_eq!(history[0].new_status, Status::InProgress);
    assert_eq!(history[0].changed_by, alice.id);
    assert_eq!(history[0].change_reason, "Cleanup started");
}

#[actix_web::test]
async fn edit_without_status_change_adds_no_history() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Loose cable", Severity::Low, Status::Open, None).await;
    let type_id = incident.incident_type_id.to_string();

    let body = multipart_body(
        &[
            ("title", "Loose cable near desk"),
            ("description", "Taped down"),
            ("incident_type", type_id.as_str()),
            ("severity", "low"),
            ("status", "open"),
        ],
        None,
    );
    let uri = format!("/incidents/{}/edit/", incident.id);
    let resp = test::call_service(&app, multipart_request(&uri, ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let rows = incident_status_history::Entity::find().count(&ctx.db).await.unwrap();
    assert_eq!(rows, 0);
}

#[actix_web::test]
async fn reporter_cannot_be_reassigned() {
    let ctx = TestContext::new().await;
    let alice = ctx.create_user("alice", Role::Regular).await;
    let mallory = ctx.create_user("mallory", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Broken lock", Severity::Medium, Status::Open, None).await;

    let mut active = incident.clone().into_active_model();
    active.reporter_id = Set(mallory.id);
    assert!(active.update(&ctx.db).await.is_err());

    assert_eq!(ctx.reload(incident.id).await.unwrap().reporter_id, alice.id);
}

#[actix_web::test]
async fn staff_status_change_is_appended_last() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let manager = ctx.create_user("manager", Role::Staff).await;
    let incident = ctx.create_incident(&alice, "Water leak", Severity::High, Status::Open, None).await;

    for status in ["in_progress", "resolved"] {
        let req = test::TestRequest::post()
            .uri(&format!("/incidents/{}/status/", incident.id))
            .cookie(ctx.session_cookie(&manager))
            .set_form([("status", status), ("reason", "triaged")])
            .to_request();
        let json: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["success"], Value::Bool(true), "{json}");
    }

    let history = incident_status_history::Entity::find()
        .filter(incident_status_history::Column::IncidentId.eq(incident.id))
        .order_by_asc(incident_status_history::Column::ChangedAt)
        .order_by_asc(incident_status_history::Column::Id)
        .all(&ctx.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    let last = history.last().unwrap();
    assert_eq!(last.old_status, Status::InProgress);
    assert_eq!(last.new_status, Status::Resolved);
    assert_eq!(last.changed_by, manager.id);
    assert_eq!(ctx.reload(incident.id).await.unwrap().status, Status::Resolved);

    let req = test::TestRequest::get()
        .uri(&format!("/incidents/{}/", incident.id))
        .cookie(ctx.session_cookie(&manager))
        .to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    let history_section = html.split("Status history").nth(1).expect("history section");
    let first = history_section.find("In Progress").expect("first change listed");
    let resolved = history_section.rfind("Resolved").expect("last change listed");
    assert!(first < resolved);
}

#[actix_web::test]
async fn status_endpoint_rejects_unknown_or_unchanged_status() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Flicker", Severity::Low, Status::Open, None).await;

    for status in ["open", "escalated"] {
        let req = test::TestRequest::post()
            .uri(&format!("/incidents/{}/status/", incident.id))
            .cookie(ctx.session_cookie(&alice))
            .set_form([("status", status)])
            .to_request();
        let json: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["success"], Value::Bool(false), "{status}");
    }

    assert_eq!(incident_status_history::Entity::find().count(&ctx.db).await.unwrap(), 0);
}

#[actix_web::test]
async fn delete_removes_report_comments_and_history() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let bob = ctx.create_user("bob", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Trip hazard", Severity::Medium, Status::Open, None).await;

    incident_comment::ActiveModel::new(incident.id, alice.id, "Cones placed")
        .insert(&ctx.db)
        .await
        .unwrap();
    incident_status_history::ActiveModel::transition(incident.id, Status::Open, Status::InProgress, alice.id, "")
        .unwrap()
        .insert(&ctx.db)
        .await
        .unwrap();

    let uri = format!("/incidents/{}/delete/", incident.id);
    let req = test::TestRequest::post().uri(&uri).cookie(ctx.session_cookie(&bob)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert!(ctx.reload(incident.id).await.is_some());

    let req = test::TestRequest::get().uri(&uri).cookie(ctx.session_cookie(&alice)).to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("Are you sure"));

    let req = test::TestRequest::post().uri(&uri).cookie(ctx.session_cookie(&alice)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/incidents/");

    assert!(ctx.reload(incident.id).await.is_none());
    assert_eq!(incident_comment::Entity::find().count(&ctx.db).await.unwrap(), 0);
    assert_eq!(incident_status_history::Entity::find().count(&ctx.db).await.unwrap(), 0);

    let req = test::TestRequest::get().uri("/incidents/").cookie(ctx.session_cookie(&alice)).to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(!html.contains("Trip hazard"));

    let req = test::TestRequest::get()
        .uri(&format!("/incidents/{}/", incident.id))
        .cookie(ctx.session_cookie(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn list_is_scoped_filtered_and_paginated() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let bob = ctx.create_user("bob", Role::Regular).await;
    let manager = ctx.create_user("manager", Role::Staff).await;

    ctx.create_incident(&alice, "Alpha spill", Severity::Low, Status::Open, None).await;
    ctx.create_incident(&alice, "Beta fire drill", Severity::High, Status::Resolved, None).await;
    ctx.create_incident(&bob, "Gamma outage", Severity::Critical, Status::Open, Some(alice.id)).await;
    ctx.create_incident(&bob, "Delta theft", Severity::Medium, Status::Open, None).await;

    let get = |uri: &str, user: &securelog::entity::user::Model| {
        test::TestRequest::get().uri(uri).cookie(ctx.session_cookie(user)).to_request()
    };

    let html = body_text(test::call_service(&app, get("/incidents/", &alice)).await).await;
    assert!(html.contains("Alpha spill"));
    assert!(html.contains("Gamma outage"));
    assert!(!html.contains("Delta theft"));

    let html = body_text(test::call_service(&app, get("/incidents/mine/", &alice)).await).await;
    assert!(html.contains("Alpha spill"));
    assert!(!html.contains("Gamma outage"));

    let html = body_text(test::call_service(&app, get("/incidents/", &manager)).await).await;
    assert!(html.contains("Delta theft"));

    let html = body_text(test::call_service(&app, get("/incidents/?status=resolved", &manager)).await).await;
    assert!(html.contains("Beta fire drill"));
    assert!(!html.contains("Alpha spill"));

    let html = body_text(test::call_service(&app, get("/incidents/?severity=bogus&search=GAMMA", &manager)).await).await;
    assert!(html.contains("Gamma outage"));
    assert!(!html.contains("Delta theft"));

    let html = body_text(test::call_service(&app, get("/incidents/?page=99", &manager)).await).await;
    assert!(html.contains("Page 1 of 1"));
}

#[actix_web::test]
async fn list_pages_hold_ten_reports() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    for n in 0..12 {
        ctx.create_incident(&alice, &format!("Report number {n:02}"), Severity::Low, Status::Open, None).await;
    }

    let req = test::TestRequest::get().uri("/incidents/?page=2").cookie(ctx.session_cookie(&alice)).to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("Page 2 of 2"));
    assert_eq!(html.matches("Report number").count(), 2);
}

#[actix_web::test]
async fn comments_require_text_and_view_permission() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let bob = ctx.create_user("bob", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Ladder missing", Severity::Low, Status::Open, None).await;
    let uri = format!("/incidents/{}/comments/", incident.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(ctx.session_cookie(&alice))
        .set_form([("comment", "   ")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("This field is required."));

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(ctx.session_cookie(&bob))
        .set_form([("comment", "drive-by")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(ctx.session_cookie(&alice))
        .set_form([("comment", "Replacement ordered")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/incidents/{}/", incident.id));

    let comments = incident_comment::Entity::find().all(&ctx.db).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author_id, alice.id);
    assert_eq!(comments[0].comment, "Replacement ordered");
}

#[actix_web::test]
async fn attachments_upload_download_and_clear() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let type_id = ctx.incident_type_id().await.to_string();

    let fields = create_fields(&type_id);
    let body = multipart_body(&as_refs(&fields), Some(("attachment", "photo.png", &b"\x89PNG fake"[..])));
    let resp = test::call_service(&app, multipart_request("/incidents/create/", ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let created = incident_report::Entity::find().one(&ctx.db).await.unwrap().unwrap();
    assert_eq!(created.attachment_name.as_deref(), Some("photo.png"));
    let stored_name = created.attachment_path.clone().unwrap();
    let stored_path = ctx.settings.media_root.join("incident_attachments").join(&stored_name);
    assert!(stored_path.exists());

    let req = test::TestRequest::get()
        .uri(&format!("/incidents/{}/attachment/", created.id))
        .cookie(ctx.session_cookie(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.contains("photo.png"));
    assert_eq!(test::read_body(resp).await.as_ref(), &b"\x89PNG fake"[..]);

    let mut fields = create_fields(&type_id);
    fields.push(("status", "open".to_string()));
    fields.push(("attachment_clear", "on".to_string()));
    let body = multipart_body(&as_refs(&fields), None);
    let uri = format!("/incidents/{}/edit/", created.id);
    let resp = test::call_service(&app, multipart_request(&uri, ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let updated = ctx.reload(created.id).await.unwrap();
    assert_eq!(updated.attachment_path, None);
    assert!(!stored_path.exists());

    let req = test::TestRequest::get()
        .uri(&format!("/incidents/{}/attachment/", created.id))
        .cookie(ctx.session_cookie(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn oversized_upload_is_a_form_error() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let type_id = ctx.incident_type_id().await.to_string();

    let big = vec![b'x'; 4096];
    let fields = create_fields(&type_id);
    let body = multipart_body(&as_refs(&fields), Some(("attachment", "dump.bin", big.as_slice())));
    let resp = test::call_service(&app, multipart_request("/incidents/create/", ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Ensure this file is at most 1024 bytes."));
    assert_eq!(incident_report::Entity::find().count(&ctx.db).await.unwrap(), 0);
}

#[actix_web::test]
async fn long_text_fields_are_not_held_to_the_upload_limit() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let type_id = ctx.incident_type_id().await.to_string();

    let description = "Pallet stack leaning. ".repeat(100);
    let mut fields = create_fields(&type_id);
    fields.retain(|(name, _)| *name != "description");
    fields.push(("description", description.clone()));

    let body = multipart_body(&as_refs(&fields), None);
    let resp = test::call_service(&app, multipart_request("/incidents/create/", ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let created = incident_report::Entity::find().one(&ctx.db).await.unwrap().unwrap();
    assert_eq!(created.description, description.trim());
}

#[actix_web::test]
async fn text_field_over_its_bound_is_a_length_error() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let type_id = ctx.incident_type_id().await.to_string();

    let mut fields = create_fields(&type_id);
    fields.retain(|(name, _)| *name != "description");
    fields.push(("description", "y".repeat(MAX_TEXT_FIELD_BYTES + 1)));

    let body = multipart_body(&as_refs(&fields), None);
    let resp = test::call_service(&app, multipart_request("/incidents/create/", ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_text(resp).await;
    assert!(html.contains(&format!("Ensure this value has at most {MAX_TEXT_FIELD_BYTES} bytes.")));
    assert!(!html.contains("This field is required."));
    assert_eq!(incident_report::Entity::find().count(&ctx.db).await.unwrap(), 0);
}

#[actix_web::test]
async fn edit_history_starts_from_the_stored_status() {
    let ctx = TestContext::new().await;
    let app = spawn_app!(ctx);
    let alice = ctx.create_user("alice", Role::Regular).await;
    let incident = ctx.create_incident(&alice, "Wet floor", Severity::Low, Status::Open, None).await;
    let type_id = incident.incident_type_id.to_string();

    // a staff member resolves it after alice opened the edit form
    let mut active = incident.clone().into_active_model();
    active.status = Set(Status::Resolved);
    active.update(&ctx.db).await.unwrap();

    let body = multipart_body(
        &[
            ("title", "Wet floor by entrance"),
            ("description", "Sign placed"),
            ("incident_type", type_id.as_str()),
            ("severity", "low"),
            ("status", "open"),
        ],
        None,
    );
    let uri = format!("/incidents/{}/edit/", incident.id);
    let resp = test::call_service(&app, multipart_request(&uri, ctx.session_cookie(&alice), body).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let history = incident_status_history::Entity::find()
        .filter(incident_status_history::Column::IncidentId.eq(incident.id))
        .all(&ctx.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_status, Status::Resolved);
    assert_eq!(history[0].new_status, Status::Open);
    assert_eq!(ctx.reload(incident.id).await.unwrap().status, Status::Open);
}
