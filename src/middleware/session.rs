//! Session cookie handling.
//!
//! - Reads the `shield_sid` cookie and loads the session from the store
//! - Puts a `Session` into request extensions (also for visitors without one)
//! - After the inner service ran: saves a modified session, deletes an emptied
//!   one, and sets or expires the cookie accordingly
//! - A session renewed at sign-in is saved under its new id; the old id is
//!   deleted and the cookie replaced
//!
//! Store failures fail the request (500).

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::session::{Session, SessionError, SessionId};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "shield_sid";

pub fn apply(router: Router, state: AppState) -> Router {
    router.layer(middleware::from_fn_with_state(state, session_middleware))
}

async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let presented = session_id_from_cookies(req.headers());

    let session = match presented {
        Some(id) => match state.sessions.load(id).await {
            Ok(Some(data)) => Session::loaded(id, data),
            Ok(None) => Session::fresh(),
            Err(err) => {
                tracing::warn!(
                    backend = state.sessions.backend_name(),
                    error = %err,
                    "session load failed"
                );
                return Err(AppError::Internal);
            }
        },
        None => Session::fresh(),
    };

    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    persist(&state, &session, presented, &mut response).await?;

    Ok(response)
}

async fn persist(
    state: &AppState,
    session: &Session,
    presented: Option<SessionId>,
    response: &mut Response,
) -> Result<(), AppError> {
    if !session.is_modified() {
        return Ok(());
    }

    let store_failed = |err: SessionError| {
        tracing::warn!(
            backend = state.sessions.backend_name(),
            error = %err,
            "session persist failed"
        );
        AppError::Internal
    };

    if let Some(retired) = session.take_retired() {
        state.sessions.delete(retired).await.map_err(store_failed)?;
    }

    if session.is_empty() {
        if let Some(id) = session.id() {
            state.sessions.delete(id).await.map_err(store_failed)?;
        }
        if presented.is_some() {
            set_cookie(response, &expired_cookie())?;
        }
        return Ok(());
    }

    let id = session.ensure_id();
    state
        .sessions
        .save(id, &session.snapshot(), state.session_ttl)
        .await
        .map_err(store_failed)?;

    if presented != Some(id) {
        set_cookie(response, &session_cookie(id, state.secure_cookies))?;
    }

    Ok(())
}

fn session_id_from_cookies(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

fn session_cookie(id: SessionId, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn set_cookie(response: &mut Response, cookie: &str) -> Result<(), AppError> {
    let value = HeaderValue::from_str(cookie).map_err(|_| AppError::Internal)?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}
