use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture};

use crate::AppState;

/// Principal authenticated earlier in the same request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

/// The session cookie's token, if the request carries one.
pub fn session_token(req: &HttpRequest, state: &AppState) -> Option<String> {
    req.cookie(&state.config.session.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Who is making this request. Never fails: absent, unknown or expired
/// sessions all extract as anonymous.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(Option<String>);

impl CurrentUser {
    pub fn username(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(principal) = req.extensions().get::<Principal>() {
            return Box::pin(ready(Ok(CurrentUser(Some(principal.0.clone())))));
        }

        let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
            return Box::pin(ready(Ok(CurrentUser::default())));
        };
        let Some(token) = session_token(req, &state) else {
            return Box::pin(ready(Ok(CurrentUser::default())));
        };

        Box::pin(async move {
            let username = state.auth_service.current_user(&token).await;
            Ok(CurrentUser(username))
        })
    }
}
