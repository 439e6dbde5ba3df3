#![allow(dead_code)]

use std::collections::HashMap;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tempfile::TempDir;

use securelog::auth::jwt::{JwtUtils, SESSION_COOKIE};
use securelog::auth::password::{create_account, NewAccount};
use securelog::configuration::Settings;
use securelog::db::init_db;
use securelog::entity::incident_report::{self, Severity, Status};
use securelog::entity::user::{self, Role};
use securelog::entity::incident_type;
use securelog::migration::{Migrator, MigratorTrait};

pub const PASSWORD: &str = "correct horse battery";
pub const BOUNDARY: &str = "securelog-test-boundary";

/// Builds the full application over a test context's database and settings.
#[macro_export]
macro_rules! spawn_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.db.clone()))
                .app_data(actix_web::web::Data::new($ctx.settings.clone()))
                .app_data(actix_web::web::Data::new(
                    securelog::util::storage::MediaStorage::new($ctx.settings.media_root.clone()),
                ))
                .configure(securelog::api::configure),
        )
        .await
    };
}

pub struct TestContext {
    pub db: DatabaseConnection,
    pub settings: Settings,
    _media: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let media = TempDir::new().expect("failed to create media dir");
        let vars: HashMap<&str, String> = HashMap::from([
            ("DATABASE_URL", "sqlite::memory:".to_string()),
            ("SECRET_KEY", "integration-test-secret".to_string()),
            ("BCRYPT_COST", "4".to_string()),
            ("MAX_UPLOAD_BYTES", "1024".to_string()),
            ("MEDIA_ROOT", media.path().to_string_lossy().into_owned()),
        ]);
        let settings = Settings::from_lookup(|key| vars.get(key).cloned()).expect("invalid test settings");

        let db = init_db(&settings).await.expect("failed to open database");
        Migrator::up(&db, None).await.expect("failed to run migrations");

        Self {
            db,
            settings,
            _media: media,
        }
    }

    pub async fn create_user(&self, username: &str, role: Role) -> user::Model {
        create_account(
            &self.db,
            NewAccount {
                username,
                email: &format!("{username}@example.com"),
                first_name: "",
                last_name: "",
                password: PASSWORD,
                role,
            },
            self.settings.bcrypt_cost,
        )
        .await
        .expect("failed to create user")
    }

    pub fn session_cookie(&self, user: &user::Model) -> Cookie<'static> {
        let token = JwtUtils::generate_token(user, &self.settings.secret_key, 1).expect("failed to sign session");
        Cookie::new(SESSION_COOKIE, token)
    }

    pub async fn incident_type_id(&self) -> i32 {
        incident_type::Entity::find()
            .order_by_asc(incident_type::Column::Id)
            .one(&self.db)
            .await
            .expect("query failed")
            .expect("seeded incident types missing")
            .id
    }

    pub async fn create_incident(
        &self,
        reporter: &user::Model,
        title: &str,
        severity: Severity,
        status: Status,
        assignee_id: Option<i32>,
    ) -> incident_report::Model {
        incident_report::ActiveModel {
            title: Set(title.to_string()),
            description: Set(format!("{title} description")),
            severity: Set(severity),
            status: Set(status),
            incident_type_id: Set(self.incident_type_id().await),
            reporter_id: Set(reporter.id),
            assignee_id: Set(assignee_id),
            location: Set("Warehouse".to_string()),
            date_occurred: Set(Utc::now()),
            people_involved: Set(String::new()),
            witnesses: Set(String::new()),
            injuries_occurred: Set(false),
            injury_details: Set(String::new()),
            property_damage: Set(false),
            damage_details: Set(String::new()),
            immediate_action_taken: Set(String::new()),
            resolution_notes: Set(String::new()),
            follow_up_required: Set(false),
            follow_up_details: Set(String::new()),
            attachment_path: Set(None),
            attachment_name: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("failed to insert incident")
    }

    pub async fn reload(&self, incident_id: i32) -> Option<incident_report::Model> {
        incident_report::Entity::find_by_id(incident_id)
            .one(&self.db)
            .await
            .expect("query failed")
    }
}

/// Encodes text fields and an optional `(field, filename, bytes)` file part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((name, filename, content)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, cookie: Cookie<'static>, body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .cookie(cookie)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_text<B>(resp: ServiceResponse<B>) -> String
where
    B: MessageBody,
{
    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).expect("body is not utf-8")
}
