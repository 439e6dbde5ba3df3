use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web::Data,
    Error, HttpMessage, HttpResponse,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;

use super::jwt::{JwtUtils, TokenVerifyResult, SESSION_COOKIE};
use crate::configuration::Settings;
use crate::entity::user;
use crate::model::auth::SessionUser;
use crate::model::global_error::AppError;

/// Requires a valid session cookie that still belongs to an existing account.
/// Authenticated requests get a [`SessionUser`] built from the current user
/// row in their extensions; everything else is redirected to the login page
/// with the original path in `next`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            match session_user(&req).await? {
                Some(user) => {
                    req.extensions_mut().insert(user);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                None => {
                    let location = login_url(req.path(), req.query_string());
                    let response = HttpResponse::Found()
                        .insert_header((header::LOCATION, location))
                        .finish()
                        .map_into_right_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}

fn session_claims(req: &ServiceRequest) -> Option<SessionUser> {
    let settings = req.app_data::<Data<Settings>>()?;
    let cookie = req.cookie(SESSION_COOKIE)?;

    match JwtUtils::verify_token(cookie.value(), &settings.secret_key) {
        TokenVerifyResult::Valid(claims) => SessionUser::try_from(claims).ok(),
        TokenVerifyResult::Expired => {
            tracing::debug!(path = req.path(), "session expired");
            None
        }
        TokenVerifyResult::Invalid => {
            tracing::warn!(path = req.path(), "rejected invalid session token");
            None
        }
    }
}

/// Resolves the session against the users table so removed accounts lose
/// access and role changes apply on the next request.
async fn session_user(req: &ServiceRequest) -> Result<Option<SessionUser>, Error> {
    let Some(claims) = session_claims(req) else {
        return Ok(None);
    };
    let Some(db) = req.app_data::<Data<DatabaseConnection>>() else {
        return Ok(None);
    };

    let account = user::Entity::find_by_id(claims.id)
        .one(db.get_ref())
        .await
        .map_err(AppError::from)?;

    match account {
        Some(account) => Ok(Some(SessionUser::from(&account))),
        None => {
            tracing::warn!(user_id = claims.id, "session refers to a removed account");
            Ok(None)
        }
    }
}

pub fn login_url(path: &str, query: &str) -> String {
    let next = if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    };
    format!("/login/?next={}", urlencoding::encode(&next))
}
