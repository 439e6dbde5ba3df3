use actix_web::{post, web, HttpResponse};
use sea_orm::{ActiveModelTrait, DatabaseConnection, TransactionTrait};
use tracing::info;

use super::incident::{find_visible, render_detail};
use crate::entity::incident_comment;
use crate::model::auth::SessionUser;
use crate::model::global_error::AppError;
use crate::model::incident::CommentForm;
use crate::web::redirect;

#[post("/incidents/{id:\\d+}/comments/")]
pub async fn add_comment(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
    path: web::Path<i32>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, AppError> {
    let incident = find_visible(db.get_ref(), path.into_inner(), &user).await?;

    let text = form.comment.trim();
    if text.is_empty() {
        return render_detail(
            db.get_ref(),
            &user,
            incident,
            form.comment.clone(),
            "This field is required.".to_string(),
        )
        .await;
    }

    let txn = db.begin().await?;
    let comment = incident_comment::ActiveModel::new(incident.id, user.id, text)
        .insert(&txn)
        .await?;
    txn.commit().await?;

    info!(incident_id = incident.id, comment_id = comment.id, author_id = user.id, "comment added");
    Ok(redirect(format!("/incidents/{}/", incident.id)))
}
