use actix_web::http::header;
use actix_web::{get, post, web, HttpResponse};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, warn};

use crate::auth::jwt::{build_logout_cookie, build_session_cookie, JwtUtils};
use crate::auth::password::{self, NewAccount};
use crate::configuration::Settings;
use crate::entity::user::{self, Role};
use crate::model::auth::{safe_next, LoginForm, LoginQuery, RegisterForm};
use crate::model::form::FormErrors;
use crate::model::global_error::AppError;
use crate::web::render;
use crate::web::templates::{LoginTemplate, NavUser, RegisterTemplate};

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Redirects to `location` with a fresh session cookie for `user`.
fn start_session(settings: &Settings, user: &user::Model, location: &str) -> Result<HttpResponse, AppError> {
    let token = JwtUtils::generate_token(user, &settings.secret_key, settings.session_ttl_hours)?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .cookie(build_session_cookie(&token, !settings.debug, settings.session_ttl_hours))
        .finish())
}

#[get("/login/")]
pub async fn login_form(query: web::Query<LoginQuery>) -> Result<HttpResponse, AppError> {
    render(&LoginTemplate {
        nav: NavUser::anonymous(),
        username: String::new(),
        next: safe_next(query.next.as_deref()),
        error: String::new(),
    })
}

#[post("/login/")]
pub async fn login(
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let next = safe_next(form.next.as_deref());

    match password::authenticate(db.get_ref(), &form.username, &form.password).await? {
        Some(user) => {
            info!(user_id = user.id, "user logged in");
            start_session(&settings, &user, &next)
        }
        None => {
            warn!(username = %form.username, "failed login attempt");
            render(&LoginTemplate {
                nav: NavUser::anonymous(),
                username: form.username,
                next,
                error: INVALID_LOGIN.to_string(),
            })
        }
    }
}

#[post("/logout/")]
pub async fn logout(settings: web::Data<Settings>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/login/"))
        .cookie(build_logout_cookie(!settings.debug))
        .finish()
}

#[get("/register/")]
pub async fn register_form() -> Result<HttpResponse, AppError> {
    render(&RegisterTemplate {
        nav: NavUser::anonymous(),
        form: RegisterForm::default(),
        errors: FormErrors::default(),
    })
}

#[post("/register/")]
pub async fn register(
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let mut errors = form.validate();

    if !errors.has("username") && password::find_by_username(db.get_ref(), &form.username).await?.is_some() {
        errors.add("username", "A user with that username already exists.");
    }

    if !errors.is_empty() {
        let form = RegisterForm {
            password1: String::new(),
            password2: String::new(),
            ..form
        };
        return render(&RegisterTemplate {
            nav: NavUser::anonymous(),
            form,
            errors,
        });
    }

    let txn = db.begin().await?;
    let user = password::create_account(
        &txn,
        NewAccount {
            username: &form.username,
            email: &form.email,
            first_name: &form.first_name,
            last_name: &form.last_name,
            password: &form.password1,
            role: Role::Regular,
        },
        settings.bcrypt_cost,
    )
    .await?;
    txn.commit().await?;

    info!(user_id = user.id, username = %user.username, "account registered");
    start_session(&settings, &user, "/")
}
