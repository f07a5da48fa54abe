use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// The caller, as established by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_staff(&self) -> actix_web::Result<()> {
        if self.role.can_mark_attendance() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Staff only"))
        }
    }

    pub fn require_scheduler(&self) -> actix_web::Result<()> {
        if self.role.can_run_sweeps() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin or scheduler only"))
        }
    }
}
