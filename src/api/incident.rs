use std::collections::{BTreeSet, HashMap};

use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, ContentType, DispositionParam, DispositionType};
use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use sea_query::{Condition, Expr, Func};
use tracing::{info, warn};

use crate::configuration::Settings;
use crate::entity::incident_report::{self, Entity as IncidentEntity, Status};
use crate::entity::{incident_comment, incident_status_history, incident_type, user};
use crate::model::auth::SessionUser;
use crate::model::common::{clamp_page, PaginationResponse, DEFAULT_PAGE_SIZE};
use crate::model::form::FormErrors;
use crate::model::global_error::{AppError, ErrorCode};
use crate::model::incident::{
    CleanIncident, FormContext, IncidentFilter, IncidentForm, IncidentListQuery, StatusChangeForm,
    StatusChangeResponse, DATETIME_INPUT_FORMAT,
};
use crate::util::multipart::{read_multipart, MultipartForm, MAX_TEXT_FIELD_BYTES};
use crate::util::storage::{MediaStorage, StoredFile};
use crate::web::templates::{
    incident_type_options, severity_options, status_options, user_options, CommentRow, ConfirmDeleteTemplate,
    HistoryRow, IncidentDetail, IncidentDetailTemplate, IncidentFormTemplate, IncidentListTemplate, IncidentRow,
    NavUser, UserNames,
};
use crate::web::{redirect, render};

// ============================================
// Access helpers
// ============================================

/// Reports a user may see: everything for staff, otherwise reported or assigned.
pub(crate) fn visibility(user: &SessionUser) -> Condition {
    if user.is_staff() {
        Condition::all()
    } else {
        Condition::any()
            .add(incident_report::Column::ReporterId.eq(user.id))
            .add(incident_report::Column::AssigneeId.eq(user.id))
    }
}

async fn find_incident(db: &DatabaseConnection, id: i32) -> Result<incident_report::Model, AppError> {
    IncidentEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::IncidentNotFound))
}

/// Re-reads a report inside `txn` so writes start from its committed state.
/// Backends with row locks hold the row until the transaction ends.
async fn lock_incident(txn: &DatabaseTransaction, id: i32) -> Result<incident_report::Model, AppError> {
    IncidentEntity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::IncidentNotFound))
}

pub(crate) async fn find_visible(
    db: &DatabaseConnection,
    id: i32,
    user: &SessionUser,
) -> Result<incident_report::Model, AppError> {
    let incident = find_incident(db, id).await?;
    if !incident.is_visible_to(user.id, user.is_staff()) {
        warn!(incident_id = id, user_id = user.id, "denied view of incident");
        return Err(AppError::new(ErrorCode::NotEnoughPermission));
    }
    Ok(incident)
}

pub(crate) async fn find_modifiable(
    db: &DatabaseConnection,
    id: i32,
    user: &SessionUser,
) -> Result<incident_report::Model, AppError> {
    let incident = find_incident(db, id).await?;
    if !incident.is_modifiable_by(user.id, user.is_staff()) {
        warn!(incident_id = id, user_id = user.id, "denied modification of incident");
        return Err(AppError::new(ErrorCode::NotEnoughPermission));
    }
    Ok(incident)
}

pub(crate) async fn load_users(
    db: &DatabaseConnection,
    ids: impl IntoIterator<Item = i32>,
) -> Result<UserNames, AppError> {
    let ids: BTreeSet<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

pub(crate) async fn load_types(db: &DatabaseConnection) -> Result<HashMap<i32, incident_type::Model>, AppError> {
    let types = incident_type::Entity::find().all(db).await?;
    Ok(types.into_iter().map(|t| (t.id, t)).collect())
}

/// Rows for a list of reports, with type and user names resolved.
pub(crate) async fn incident_rows(
    db: &DatabaseConnection,
    incidents: &[incident_report::Model],
) -> Result<Vec<IncidentRow>, AppError> {
    let types = load_types(db).await?;
    let users = load_users(
        db,
        incidents
            .iter()
            .flat_map(|i| std::iter::once(i.reporter_id).chain(i.assignee_id)),
    )
    .await?;

    Ok(incidents
        .iter()
        .map(|i| IncidentRow::build(i, &types, &users))
        .collect())
}

// ============================================
// List
// ============================================

fn apply_filter(select: Select<IncidentEntity>, filter: &IncidentFilter) -> Select<IncidentEntity> {
    let mut condition = Condition::all();

    if let Some(status) = filter.status {
        condition = condition.add(incident_report::Column::Status.eq(status));
    }
    if let Some(severity) = filter.severity {
        condition = condition.add(incident_report::Column::Severity.eq(severity));
    }
    if let Some(assignee_id) = filter.assignee_id {
        condition = condition.add(incident_report::Column::AssigneeId.eq(assignee_id));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.to_lowercase());
        let lower_like = |column: incident_report::Column| {
            Expr::expr(Func::lower(Expr::col(column))).like(pattern.clone())
        };
        condition = condition.add(
            Condition::any()
                .add(lower_like(incident_report::Column::Title))
                .add(lower_like(incident_report::Column::Description))
                .add(lower_like(incident_report::Column::Location)),
        );
    }

    select.filter(condition)
}

async fn render_list(
    db: &DatabaseConnection,
    user: &SessionUser,
    query: &IncidentListQuery,
    only_mine: bool,
) -> Result<HttpResponse, AppError> {
    let filter = IncidentFilter::from(query);

    let scope = if only_mine {
        IncidentEntity::find().filter(incident_report::Column::ReporterId.eq(user.id))
    } else {
        IncidentEntity::find().filter(visibility(user))
    };
    let select = apply_filter(scope, &filter);

    let total = select.clone().count(db).await?;
    let page = clamp_page(query.page, total, DEFAULT_PAGE_SIZE);

    let incidents = select
        .order_by_desc(incident_report::Column::DateOccurred)
        .order_by_desc(incident_report::Column::Id)
        .paginate(db, DEFAULT_PAGE_SIZE)
        .fetch_page(page - 1)
        .await?;
    let rows = incident_rows(db, &incidents).await?;

    let assignees = if user.is_staff() {
        user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?
    } else {
        Vec::new()
    };
    let current_assignee = filter.assignee_id.map(|id| id.to_string()).unwrap_or_default();

    render(&IncidentListTemplate {
        nav: NavUser::from(user),
        heading: if only_mine { "My Reports" } else { "Incident Reports" }.to_string(),
        page_path: if only_mine { "/incidents/mine/" } else { "/incidents/" }.to_string(),
        incidents: PaginationResponse::new(rows, page, DEFAULT_PAGE_SIZE, total),
        status_options: status_options(filter.status.map(|s| s.as_str()).unwrap_or_default(), true),
        severity_options: severity_options(filter.severity.map(|s| s.as_str()).unwrap_or_default(), true),
        assignee_options: user_options(&assignees, &current_assignee, "All Assignees"),
        show_assignee_filter: user.is_staff(),
        search: filter.search.clone().unwrap_or_default(),
        filter_query: filter.to_query_string(),
    })
}

#[get("/incidents/")]
pub async fn list_incidents(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    query: web::Query<IncidentListQuery>,
) -> Result<HttpResponse, AppError> {
    render_list(db.get_ref(), &user, &query, false).await
}

#[get("/incidents/mine/")]
pub async fn my_incidents(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    query: web::Query<IncidentListQuery>,
) -> Result<HttpResponse, AppError> {
    render_list(db.get_ref(), &user, &query, true).await
}

// ============================================
// Detail
// ============================================

/// Renders the detail page. `comment_text` and `comment_error` carry a
/// rejected comment submission back to the form.
pub(crate) async fn render_detail(
    db: &DatabaseConnection,
    user: &SessionUser,
    incident: incident_report::Model,
    comment_text: String,
    comment_error: String,
) -> Result<HttpResponse, AppError> {
    let comments = incident_comment::Entity::find()
        .filter(incident_comment::Column::IncidentId.eq(incident.id))
        .order_by_asc(incident_comment::Column::CreatedAt)
        .order_by_asc(incident_comment::Column::Id)
        .all(db)
        .await?;

    let history = incident_status_history::Entity::find()
        .filter(incident_status_history::Column::IncidentId.eq(incident.id))
        .order_by_asc(incident_status_history::Column::ChangedAt)
        .order_by_asc(incident_status_history::Column::Id)
        .all(db)
        .await?;

    let incident_type = incident_type::Entity::find_by_id(incident.incident_type_id)
        .one(db)
        .await?;

    let user_ids = std::iter::once(incident.reporter_id)
        .chain(incident.assignee_id)
        .chain(comments.iter().map(|c| c.author_id))
        .chain(history.iter().map(|h| h.changed_by));
    let users = load_users(db, user_ids).await?;

    render(&IncidentDetailTemplate {
        nav: NavUser::from(user),
        incident: IncidentDetail::build(&incident, incident_type.as_ref(), &users),
        comments: comments.iter().map(|c| CommentRow::build(c, &users)).collect(),
        history: history.iter().map(|h| HistoryRow::build(h, &users)).collect(),
        can_modify: incident.is_modifiable_by(user.id, user.is_staff()),
        status_options: status_options(incident.status.as_str(), false),
        comment_text,
        comment_error,
    })
}

#[get("/incidents/{id:\\d+}/")]
pub async fn incident_detail(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let incident = find_visible(db.get_ref(), path.into_inner(), &user).await?;
    render_detail(db.get_ref(), &user, incident, String::new(), String::new()).await
}

// ============================================
// Create / edit
// ============================================

async fn form_choices(
    db: &DatabaseConnection,
    is_staff: bool,
) -> Result<(Vec<incident_type::Model>, Vec<user::Model>), AppError> {
    let types = incident_type::Entity::find()
        .order_by_asc(incident_type::Column::Name)
        .all(db)
        .await?;

    let users = if is_staff {
        user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?
    } else {
        Vec::new()
    };

    Ok((types, users))
}

fn form_page(
    user: &SessionUser,
    form: IncidentForm,
    errors: FormErrors,
    types: &[incident_type::Model],
    users: &[user::Model],
    existing: Option<&incident_report::Model>,
) -> Result<HttpResponse, AppError> {
    render(&IncidentFormTemplate {
        nav: NavUser::from(user),
        is_edit: existing.is_some(),
        action: existing
            .map(|i| format!("/incidents/{}/edit/", i.id))
            .unwrap_or_else(|| "/incidents/create/".to_string()),
        cancel_url: existing
            .map(|i| format!("/incidents/{}/", i.id))
            .unwrap_or_else(|| "/incidents/".to_string()),
        type_options: incident_type_options(types, &form.incident_type),
        severity_options: severity_options(&form.severity, false),
        status_options: status_options(&form.status, false),
        assignee_options: user_options(users, &form.assignee, "Unassigned"),
        show_assignee: user.is_staff(),
        has_attachment: existing.is_some_and(|i| i.attachment_path.is_some()),
        attachment_name: existing
            .and_then(|i| i.attachment_name.clone())
            .unwrap_or_default(),
        form,
        errors,
    })
}

/// Validates a submitted form and folds oversized parts into the errors.
fn validate_submission(
    form: &IncidentForm,
    submission: &MultipartForm,
    types: &[incident_type::Model],
    users: &[user::Model],
    user: &SessionUser,
    editing: bool,
    max_upload_bytes: usize,
) -> Result<CleanIncident, FormErrors> {
    let incident_type_ids: Vec<i32> = types.iter().map(|t| t.id).collect();
    let user_ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let ctx = FormContext {
        incident_type_ids: &incident_type_ids,
        user_ids: &user_ids,
        is_staff: user.is_staff(),
        editing,
    };

    let result = form.validate(&ctx);
    if !submission.file_too_large && submission.oversized_fields.is_empty() {
        return result;
    }

    let mut errors = result.err().unwrap_or_default();
    for field in &submission.oversized_fields {
        if !errors.has(field) {
            errors.add(field, &format!("Ensure this value has at most {MAX_TEXT_FIELD_BYTES} bytes."));
        }
    }
    if submission.file_too_large {
        errors.add(
            "attachment",
            &format!("Ensure this file is at most {max_upload_bytes} bytes."),
        );
    }
    Err(errors)
}

#[get("/incidents/create/")]
pub async fn create_incident_form(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
) -> Result<HttpResponse, AppError> {
    let (types, users) = form_choices(db.get_ref(), user.is_staff()).await?;
    let form = IncidentForm {
        severity: "medium".to_string(),
        status: Status::Open.as_str().to_string(),
        date_occurred: Utc::now().format(DATETIME_INPUT_FORMAT).to_string(),
        ..Default::default()
    };
    form_page(&user, form, FormErrors::default(), &types, &users, None)
}

async fn insert_incident(
    db: &DatabaseConnection,
    clean: CleanIncident,
    reporter_id: i32,
    attachment: Option<&StoredFile>,
) -> Result<incident_report::Model, AppError> {
    let txn = db.begin().await?;

    let incident = incident_report::ActiveModel {
        title: Set(clean.title),
        description: Set(clean.description),
        severity: Set(clean.severity),
        status: Set(Status::Open),
        incident_type_id: Set(clean.incident_type_id),
        reporter_id: Set(reporter_id),
        assignee_id: Set(clean.assignee_id.flatten()),
        location: Set(clean.location),
        date_occurred: Set(clean.date_occurred.unwrap_or_else(Utc::now)),
        people_involved: Set(clean.people_involved),
        witnesses: Set(clean.witnesses),
        injuries_occurred: Set(clean.injuries_occurred),
        injury_details: Set(clean.injury_details),
        property_damage: Set(clean.property_damage),
        damage_details: Set(clean.damage_details),
        immediate_action_taken: Set(clean.immediate_action_taken),
        resolution_notes: Set(clean.resolution_notes),
        follow_up_required: Set(clean.follow_up_required),
        follow_up_details: Set(clean.follow_up_details),
        attachment_path: Set(attachment.map(|a| a.stored_name.clone())),
        attachment_name: Set(attachment.map(|a| a.original_name.clone())),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(incident)
}

#[post("/incidents/create/")]
pub async fn create_incident(
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    storage: web::Data<MediaStorage>,
    user: web::ReqData<SessionUser>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut submission = read_multipart(payload, settings.max_upload_bytes).await?;
    let form = IncidentForm::from_fields(std::mem::take(&mut submission.fields));
    let (types, users) = form_choices(db.get_ref(), user.is_staff()).await?;

    let clean = match validate_submission(
        &form,
        &submission,
        &types,
        &users,
        &user,
        false,
        settings.max_upload_bytes,
    ) {
        Ok(clean) => clean,
        Err(errors) => return form_page(&user, form, errors, &types, &users, None),
    };

    let stored = match &submission.file {
        Some(file) => Some(storage.save(file).await?),
        None => None,
    };

    let incident = match insert_incident(db.get_ref(), clean, user.id, stored.as_ref()).await {
        Ok(incident) => incident,
        Err(err) => {
            if let Some(stored) = &stored {
                storage.delete(&stored.stored_name).await;
            }
            return Err(err);
        }
    };

    info!(
        incident_id = incident.id,
        reporter_id = user.id,
        severity = incident.severity.as_str(),
        "incident reported"
    );
    Ok(redirect(format!("/incidents/{}/", incident.id)))
}

#[get("/incidents/{id:\\d+}/edit/")]
pub async fn edit_incident_form(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let incident = find_modifiable(db.get_ref(), path.into_inner(), &user).await?;
    let (types, users) = form_choices(db.get_ref(), user.is_staff()).await?;
    let form = IncidentForm::from_model(&incident);
    form_page(&user, form, FormErrors::default(), &types, &users, Some(&incident))
}

/// Writes an edit and any status history row in one transaction. Returns the
/// stored name of an attachment that is no longer referenced.
async fn update_incident(
    db: &DatabaseConnection,
    incident_id: i32,
    clean: CleanIncident,
    changed_by: i32,
    attachment: Option<&StoredFile>,
) -> Result<Option<String>, AppError> {
    let txn = db.begin().await?;

    let incident = lock_incident(&txn, incident_id).await?;
    let old_status = incident.status;
    let new_status = clean.status.unwrap_or(old_status);
    let old_attachment = incident.attachment_path.clone();

    let mut active: incident_report::ActiveModel = incident.into();
    active.title = Set(clean.title);
    active.description = Set(clean.description);
    active.severity = Set(clean.severity);
    active.status = Set(new_status);
    active.incident_type_id = Set(clean.incident_type_id);
    if let Some(assignee_id) = clean.assignee_id {
        active.assignee_id = Set(assignee_id);
    }
    active.location = Set(clean.location);
    if let Some(date_occurred) = clean.date_occurred {
        active.date_occurred = Set(date_occurred);
    }
    active.people_involved = Set(clean.people_involved);
    active.witnesses = Set(clean.witnesses);
    active.injuries_occurred = Set(clean.injuries_occurred);
    active.injury_details = Set(clean.injury_details);
    active.property_damage = Set(clean.property_damage);
    active.damage_details = Set(clean.damage_details);
    active.immediate_action_taken = Set(clean.immediate_action_taken);
    active.resolution_notes = Set(clean.resolution_notes);
    active.follow_up_required = Set(clean.follow_up_required);
    active.follow_up_details = Set(clean.follow_up_details);

    let mut orphaned = None;
    if let Some(stored) = attachment {
        active.attachment_path = Set(Some(stored.stored_name.clone()));
        active.attachment_name = Set(Some(stored.original_name.clone()));
        orphaned = old_attachment;
    } else if clean.clear_attachment && old_attachment.is_some() {
        active.attachment_path = Set(None);
        active.attachment_name = Set(None);
        orphaned = old_attachment;
    }

    active.update(&txn).await?;

    if let Some(history) = incident_status_history::ActiveModel::transition(
        incident_id,
        old_status,
        new_status,
        changed_by,
        clean.status_change_reason,
    ) {
        history.insert(&txn).await?;
        info!(
            incident_id,
            from = old_status.as_str(),
            to = new_status.as_str(),
            changed_by,
            "incident status changed"
        );
    }

    txn.commit().await?;
    Ok(orphaned)
}

#[post("/incidents/{id:\\d+}/edit/")]
pub async fn edit_incident(
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    storage: web::Data<MediaStorage>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let incident = find_modifiable(db.get_ref(), path.into_inner(), &user).await?;
    let incident_id = incident.id;

    let mut submission = read_multipart(payload, settings.max_upload_bytes).await?;
    let form = IncidentForm::from_fields(std::mem::take(&mut submission.fields));
    let (types, users) = form_choices(db.get_ref(), user.is_staff()).await?;

    let clean = match validate_submission(
        &form,
        &submission,
        &types,
        &users,
        &user,
        true,
        settings.max_upload_bytes,
    ) {
        Ok(clean) => clean,
        Err(errors) => return form_page(&user, form, errors, &types, &users, Some(&incident)),
    };

    let stored = match &submission.file {
        Some(file) => Some(storage.save(file).await?),
        None => None,
    };

    let orphaned = match update_incident(db.get_ref(), incident_id, clean, user.id, stored.as_ref()).await {
        Ok(orphaned) => orphaned,
        Err(err) => {
            if let Some(stored) = &stored {
                storage.delete(&stored.stored_name).await;
            }
            return Err(err);
        }
    };

    if let Some(orphaned) = orphaned {
        storage.delete(&orphaned).await;
    }

    info!(incident_id, user_id = user.id, "incident updated");
    Ok(redirect(format!("/incidents/{incident_id}/")))
}

// ============================================
// Delete
// ============================================

#[get("/incidents/{id:\\d+}/delete/")]
pub async fn delete_incident_confirm(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let incident = find_modifiable(db.get_ref(), path.into_inner(), &user).await?;
    render(&ConfirmDeleteTemplate {
        nav: NavUser::from(&*user),
        id: incident.id,
        title: incident.title,
    })
}

#[post("/incidents/{id:\\d+}/delete/")]
pub async fn delete_incident(
    db: web::Data<DatabaseConnection>,
    storage: web::Data<MediaStorage>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let incident = find_modifiable(db.get_ref(), path.into_inner(), &user).await?;

    let txn = db.begin().await?;
    incident_comment::Entity::delete_many()
        .filter(incident_comment::Column::IncidentId.eq(incident.id))
        .exec(&txn)
        .await?;
    incident_status_history::Entity::delete_many()
        .filter(incident_status_history::Column::IncidentId.eq(incident.id))
        .exec(&txn)
        .await?;
    IncidentEntity::delete_by_id(incident.id).exec(&txn).await?;
    txn.commit().await?;

    if let Some(attachment) = &incident.attachment_path {
        storage.delete(attachment).await;
    }

    info!(incident_id = incident.id, user_id = user.id, "incident deleted");
    Ok(redirect("/incidents/"))
}

// ============================================
// Quick status change
// ============================================

fn status_response(success: bool, message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(StatusChangeResponse {
        success,
        message: message.into(),
    })
}

#[post("/incidents/{id:\\d+}/status/")]
pub async fn change_status(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
    form: web::Form<StatusChangeForm>,
) -> Result<HttpResponse, AppError> {
    let incident_id = find_modifiable(db.get_ref(), path.into_inner(), &user).await?.id;

    let Some(new_status) = Status::parse(form.status.trim()) else {
        return Ok(status_response(false, "Invalid status"));
    };

    let txn = db.begin().await?;
    let incident = lock_incident(&txn, incident_id).await?;
    let old_status = incident.status;
    let Some(history) = incident_status_history::ActiveModel::transition(
        incident_id,
        old_status,
        new_status,
        user.id,
        form.reason.trim(),
    ) else {
        return Ok(status_response(false, format!("Status is already {}", old_status.label())));
    };

    let mut active: incident_report::ActiveModel = incident.into();
    active.status = Set(new_status);
    active.update(&txn).await?;
    history.insert(&txn).await?;
    txn.commit().await?;

    info!(
        incident_id,
        from = old_status.as_str(),
        to = new_status.as_str(),
        changed_by = user.id,
        "incident status changed"
    );
    Ok(status_response(true, format!("Status updated to {}", new_status.label())))
}

// ============================================
// Attachment
// ============================================

#[get("/incidents/{id:\\d+}/attachment/")]
pub async fn download_attachment(
    db: web::Data<DatabaseConnection>,
    storage: web::Data<MediaStorage>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let incident = find_visible(db.get_ref(), path.into_inner(), &user).await?;
    let Some(stored_name) = incident.attachment_path.as_deref() else {
        return Err(AppError::new(ErrorCode::AttachmentNotFound));
    };

    let content = storage.read(stored_name).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            warn!(incident_id = incident.id, stored_name, "attachment missing from storage");
            AppError::new(ErrorCode::AttachmentNotFound)
        } else {
            AppError::from(err)
        }
    })?;

    let filename = incident
        .attachment_name
        .clone()
        .unwrap_or_else(|| stored_name.to_string());

    Ok(HttpResponse::Ok()
        .content_type(ContentType::octet_stream())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(content))
}
