use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::auth::extract::{session_token, CurrentUser, Principal};
use crate::auth::session::UserLoader;
use crate::config::SessionConfig;
use crate::error::{AppError, AuthError};
use crate::templates;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login_page(user: CurrentUser, state: web::Data<AppState>) -> HttpResponse {
    if user.is_authenticated() {
        return redirect(&state.config.auth.landing_page);
    }
    html(StatusCode::OK, templates::login_page(None, ""))
}

pub async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let client = client_key(&req);
    info!("Received login request for username: {}", form.username);

    match state.auth_service.login(&form.username, &form.password, &client).await {
        Ok(token) => {
            // Read by `CurrentUser` in any middleware that wraps this route,
            // since the new cookie only arrives with the next request.
            req.extensions_mut().insert(Principal(form.username.clone()));
            let cookie = session_cookie(&state.config.session, token.into_string());
            Ok(HttpResponse::Found()
                .insert_header((header::LOCATION, state.config.auth.landing_page.as_str()))
                .cookie(cookie)
                .finish())
        }
        Err(AppError::AuthError(e @ (AuthError::InvalidCredentials | AuthError::RateLimited))) => {
            Ok(html(e.status_code(), templates::login_page(Some(&e.to_string()), &form.username)))
        }
        Err(e) => {
            error!("Login for {} failed: {}", form.username, e);
            Err(e)
        }
    }
}

pub async fn register_page(user: CurrentUser, state: web::Data<AppState>) -> HttpResponse {
    if user.is_authenticated() {
        return redirect(&state.config.auth.landing_page);
    }
    html(StatusCode::OK, templates::register_page(None, "", ""))
}

pub async fn register(
    form: web::Form<RegisterForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for username: {}", form.username);

    let result = state
        .auth_service
        .register(&form.username, &form.email, &form.password)
        .await;

    let rejected = |status: StatusCode, message: &str| {
        html(status, templates::register_page(Some(message), &form.username, &form.email))
    };

    match result {
        Ok(()) => Ok(redirect("/login")),
        Err(AppError::ValidationError(message)) => {
            warn!("Registration rejected for {}: {}", form.username, message);
            Ok(rejected(StatusCode::BAD_REQUEST, &message))
        }
        Err(AppError::AuthError(e @ AuthError::DuplicateUsername)) => {
            warn!("Registration rejected for {}: {}", form.username, e);
            Ok(rejected(e.status_code(), &e.to_string()))
        }
        Err(e) => {
            error!("Registration for {} failed: {}", form.username, e);
            Err(e)
        }
    }
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(token) = session_token(&req, &state) {
        state.auth_service.logout(&token).await;
    }

    // Clear the cookie even when the session was already gone.
    let mut removal = Cookie::build(state.config.session.cookie_name.clone(), "")
        .path("/")
        .finish();
    removal.make_removal();

    HttpResponse::Found()
        .insert_header((header::LOCATION, "/login"))
        .cookie(removal)
        .finish()
}

pub async fn home(user: CurrentUser, state: web::Data<AppState>) -> HttpResponse {
    let Some(username) = user.username() else {
        return redirect("/login");
    };
    // The session only names the user; the record may have been deleted since.
    match state.auth_service.credentials().load_user(username).await {
        Some(record) => html(StatusCode::OK, templates::home_page(&record)),
        None => redirect("/login"),
    }
}

pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    redirect(&state.config.auth.landing_page)
}

fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone(), token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .max_age(CookieDuration::minutes(config.ttl_minutes))
        .finish()
}

fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}
