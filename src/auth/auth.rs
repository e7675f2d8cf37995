use crate::config::Config;
use crate::{auth::jwt::verify_token, model::role::Role};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to a student record
    pub student_id: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
            student_id: claims.student_id,
        }))
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

    /// Admins may act for anyone; students only for themselves.
    pub fn require_self_or_admin(&self, student_id: &str) -> actix_web::Result<()> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Student if self.student_id.as_deref() == Some(student_id) => Ok(()),
            Role::Student => Err(actix_web::error::ErrorForbidden(
                "Students may only access their own attendance",
            )),
        }
    }

    /// Student id from the token, falling back to `requested` for admins.
    pub fn resolve_student(&self, requested: Option<&str>) -> actix_web::Result<String> {
        let student_id = match (requested, &self.student_id) {
            (Some(id), _) => id.to_string(),
            (None, Some(own)) => own.clone(),
            (None, None) => {
                return Err(actix_web::error::ErrorBadRequest(
                    "Missing required parameter: student_id",
                ));
            }
        };
        self.require_self_or_admin(&student_id)?;
        Ok(student_id)
    }
}
