use actix_web::{get, post, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, warn};

use crate::entity::incident_type::{self, Entity as IncidentTypeEntity};
use crate::model::auth::SessionUser;
use crate::model::form::FormErrors;
use crate::model::global_error::{AppError, ErrorCode};
use crate::model::incident::IncidentTypeForm;
use crate::web::templates::{IncidentTypeFormTemplate, IncidentTypeListTemplate, NavUser};
use crate::web::{redirect, render};

fn require_staff(user: &SessionUser) -> Result<(), AppError> {
    if user.is_staff() {
        Ok(())
    } else {
        warn!(user_id = user.id, "non-staff user tried to manage incident types");
        Err(AppError::new(ErrorCode::StaffOnly))
    }
}

async fn find_type(db: &DatabaseConnection, id: i32) -> Result<incident_type::Model, AppError> {
    IncidentTypeEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::IncidentTypeNotFound))
}

/// Field validation plus the unique-name check, ignoring `exclude_id`.
async fn validate_type(
    db: &DatabaseConnection,
    form: &IncidentTypeForm,
    exclude_id: Option<i32>,
) -> Result<FormErrors, AppError> {
    let mut errors = form.validate();
    if errors.has("name") {
        return Ok(errors);
    }

    let mut duplicates = IncidentTypeEntity::find().filter(incident_type::Column::Name.eq(form.name.trim()));
    if let Some(id) = exclude_id {
        duplicates = duplicates.filter(incident_type::Column::Id.ne(id));
    }
    if duplicates.count(db).await? > 0 {
        errors.add("name", "Incident type with this name already exists.");
    }
    Ok(errors)
}

fn form_page(user: &SessionUser, form: IncidentTypeForm, errors: FormErrors, id: Option<i32>) -> Result<HttpResponse, AppError> {
    render(&IncidentTypeFormTemplate {
        nav: NavUser::from(user),
        is_edit: id.is_some(),
        action: match id {
            Some(id) => format!("/incident-types/{id}/edit/"),
            None => "/incident-types/create/".to_string(),
        },
        form,
        errors,
    })
}

#[get("/incident-types/")]
pub async fn list_incident_types(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
) -> Result<HttpResponse, AppError> {
    let types = IncidentTypeEntity::find()
        .order_by_asc(incident_type::Column::Name)
        .all(db.get_ref())
        .await?;

    render(&IncidentTypeListTemplate {
        nav: NavUser::from(&*user),
        types,
        can_manage: user.is_staff(),
    })
}

#[get("/incident-types/create/")]
pub async fn create_incident_type_form(user: web::ReqData<SessionUser>) -> Result<HttpResponse, AppError> {
    require_staff(&user)?;
    form_page(&user, IncidentTypeForm::default(), FormErrors::default(), None)
}

#[post("/incident-types/create/")]
pub async fn create_incident_type(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    form: web::Form<IncidentTypeForm>,
) -> Result<HttpResponse, AppError> {
    require_staff(&user)?;
    let form = form.into_inner();

    let errors = validate_type(db.get_ref(), &form, None).await?;
    if !errors.is_empty() {
        return form_page(&user, form, errors, None);
    }

    let txn = db.begin().await?;
    let created = incident_type::ActiveModel {
        name: Set(form.name.trim().to_string()),
        description: Set(form.description.trim().to_string()),
        color_code: Set(form.color_or_default()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(incident_type_id = created.id, name = %created.name, "incident type created");
    Ok(redirect("/incident-types/"))
}

#[get("/incident-types/{id:\\d+}/edit/")]
pub async fn edit_incident_type_form(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    require_staff(&user)?;
    let existing = find_type(db.get_ref(), path.into_inner()).await?;
    form_page(&user, IncidentTypeForm::from_model(&existing), FormErrors::default(), Some(existing.id))
}

#[post("/incident-types/{id:\\d+}/edit/")]
pub async fn edit_incident_type(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
    form: web::Form<IncidentTypeForm>,
) -> Result<HttpResponse, AppError> {
    require_staff(&user)?;
    let existing = find_type(db.get_ref(), path.into_inner()).await?;
    let form = form.into_inner();

    let errors = validate_type(db.get_ref(), &form, Some(existing.id)).await?;
    if !errors.is_empty() {
        return form_page(&user, form, errors, Some(existing.id));
    }

    let txn = db.begin().await?;
    let mut active: incident_type::ActiveModel = existing.into();
    active.name = Set(form.name.trim().to_string());
    active.description = Set(form.description.trim().to_string());
    active.color_code = Set(form.color_or_default());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(incident_type_id = updated.id, name = %updated.name, "incident type updated");
    Ok(redirect("/incident-types/"))
}
