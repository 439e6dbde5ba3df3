use std::collections::HashMap;

use actix_web::{get, web, HttpResponse};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use sea_query::{Condition, Expr};

use super::incident::{incident_rows, visibility};
use crate::entity::incident_report::{self, Entity as IncidentEntity, Severity, Status};
use crate::model::auth::SessionUser;
use crate::model::global_error::AppError;
use crate::web::render;
use crate::web::templates::{CountRow, DashboardTemplate, NavUser};

const RECENT_INCIDENTS: u64 = 5;

/// Number of visible reports per status, with every status present.
pub async fn count_by_status(
    db: &DatabaseConnection,
    scope: Condition,
) -> Result<HashMap<Status, u64>, AppError> {
    let rows: Vec<(Status, i64)> = IncidentEntity::find()
        .select_only()
        .column(incident_report::Column::Status)
        .column_as(Expr::col(incident_report::Column::Id).count(), "count")
        .filter(scope)
        .group_by(incident_report::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let mut counts: HashMap<Status, u64> = Status::ALL.iter().map(|s| (*s, 0)).collect();
    for (status, count) in rows {
        counts.insert(status, count.max(0) as u64);
    }
    Ok(counts)
}

/// Number of visible reports per severity, with every severity present.
pub async fn count_by_severity(
    db: &DatabaseConnection,
    scope: Condition,
) -> Result<HashMap<Severity, u64>, AppError> {
    let rows: Vec<(Severity, i64)> = IncidentEntity::find()
        .select_only()
        .column(incident_report::Column::Severity)
        .column_as(Expr::col(incident_report::Column::Id).count(), "count")
        .filter(scope)
        .group_by(incident_report::Column::Severity)
        .into_tuple()
        .all(db)
        .await?;

    let mut counts: HashMap<Severity, u64> = Severity::ALL.iter().map(|s| (*s, 0)).collect();
    for (severity, count) in rows {
        counts.insert(severity, count.max(0) as u64);
    }
    Ok(counts)
}

async fn render_dashboard(db: &DatabaseConnection, user: &SessionUser) -> Result<HttpResponse, AppError> {
    let by_status = count_by_status(db, visibility(user)).await?;
    let by_severity = count_by_severity(db, visibility(user)).await?;

    let my_incidents = IncidentEntity::find()
        .filter(incident_report::Column::ReporterId.eq(user.id))
        .count(db)
        .await?;

    let recent = IncidentEntity::find()
        .filter(visibility(user))
        .order_by_desc(incident_report::Column::CreatedAt)
        .order_by_desc(incident_report::Column::Id)
        .limit(RECENT_INCIDENTS)
        .all(db)
        .await?;

    let status_counts = Status::ALL
        .iter()
        .map(|s| CountRow {
            key: s.as_str().to_string(),
            label: s.label().to_string(),
            color: s.color().to_string(),
            count: by_status[s],
        })
        .collect();
    let severity_counts = Severity::ALL
        .iter()
        .map(|s| CountRow {
            key: s.as_str().to_string(),
            label: s.label().to_string(),
            color: s.color().to_string(),
            count: by_severity[s],
        })
        .collect();

    render(&DashboardTemplate {
        nav: NavUser::from(user),
        total_incidents: by_status.values().sum(),
        urgent_incidents: by_severity
            .iter()
            .filter(|(s, _)| s.is_urgent())
            .map(|(_, n)| n)
            .sum(),
        my_incidents,
        pending_incidents: by_status
            .iter()
            .filter(|(s, _)| s.is_pending())
            .map(|(_, n)| n)
            .sum(),
        status_counts,
        severity_counts,
        recent_incidents: incident_rows(db, &recent).await?,
    })
}

#[get("/")]
pub async fn index(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
) -> Result<HttpResponse, AppError> {
    render_dashboard(db.get_ref(), &user).await
}

#[get("/dashboard/")]
pub async fn dashboard(
    db: web::Data<DatabaseConnection>,
    user: web::ReqData<SessionUser>,
) -> Result<HttpResponse, AppError> {
    render_dashboard(db.get_ref(), &user).await
}
