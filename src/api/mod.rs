mod assets;
mod auth;
mod comment;
mod health;
mod incident;
mod incident_type;
mod overview;

use actix_web::web::{self, scope, ServiceConfig};

use crate::auth::AuthMiddleware;

pub use crate::api::assets::{not_found, stylesheet};
pub use crate::api::auth::{login, login_form, logout, register, register_form};
pub use crate::api::comment::add_comment;
pub use crate::api::health::health_check;
pub use crate::api::incident::{
    change_status, create_incident, create_incident_form, delete_incident, delete_incident_confirm,
    download_attachment, edit_incident, edit_incident_form, incident_detail, list_incidents, my_incidents,
};
pub use crate::api::incident_type::{
    create_incident_type, create_incident_type_form, edit_incident_type, edit_incident_type_form,
    list_incident_types,
};
pub use crate::api::overview::{count_by_severity, count_by_status, dashboard, index};

/// Registers every route. Public pages come first; everything else sits behind
/// the session check.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(health_check)
        .service(stylesheet)
        .service(login_form)
        .service(login)
        .service(logout)
        .service(register_form)
        .service(register)
        .service(
            scope("")
                .wrap(AuthMiddleware)
                .service(index)
                .service(dashboard)
                .service(list_incidents)
                .service(my_incidents)
                .service(create_incident_form)
                .service(create_incident)
                .service(incident_detail)
                .service(edit_incident_form)
                .service(edit_incident)
                .service(delete_incident_confirm)
                .service(delete_incident)
                .service(change_status)
                .service(download_attachment)
                .service(add_comment)
                .service(list_incident_types)
                .service(create_incident_type_form)
                .service(create_incident_type)
                .service(edit_incident_type_form)
                .service(edit_incident_type)
                .default_service(web::to(not_found)),
        );
}
