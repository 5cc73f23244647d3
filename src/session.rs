//! Admin session cookie.
//!
//! There is no per-admin identity and no session store: the cookie value
//! `"ok"` is the whole credential, valid for ten minutes. Every mutating
//! admin operation checks it with [`is_authenticated`]. The frontend fires a
//! best-effort logout on tab hide/close; the Max-Age is the authoritative
//! backstop for forgotten tabs.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::config::Config;

pub const SESSION_COOKIE: &str = "admin_session";
pub const SESSION_OK: &str = "ok";
pub const SESSION_TTL: Duration = Duration::seconds(600);

pub fn is_authenticated(jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE)
        .is_some_and(|cookie| cookie.value() == SESSION_OK)
}

pub fn credentials_match(config: &Config, user: &str, pass: &str) -> bool {
    user == config.admin_user && pass == config.admin_pass
}

/// Cookie set on successful login.
pub fn grant(secure: bool) -> Cookie<'static> {
    session_cookie(SESSION_OK, SESSION_TTL, secure)
}

/// Cookie overwrite that ends the session immediately.
pub fn revoke(secure: bool) -> Cookie<'static> {
    session_cookie("", Duration::ZERO, secure)
}

fn session_cookie(value: &'static str, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(max_age)
        .build()
}
