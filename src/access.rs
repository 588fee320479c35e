//! Access router: keeps superusers inside the admin area and regular users out of it.
//!
//! The decision is a pure function of [`RequestContext`]. The next handler is an explicit
//! `forward` callback, so the policy can be exercised without a running router.

use askama::Template;
use axum::{
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::future::Future;

use crate::auth::Viewer;

/// Path prefix of the admin area. Also the redirect target for superusers.
pub const ADMIN_PREFIX: &str = "/admin/";

pub const CLINIC_NAME: &str = "Clinic Portal";

/// RequestContext
///
/// What the access router knows about a request: its path and the requester's flags.
/// Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub path: String,
    pub is_authenticated: bool,
    pub is_superuser: bool,
}

/// AccessDecision
///
/// Outcome of the policy, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Authenticated non-superuser inside the admin area.
    RenderHome,
    /// Authenticated superuser outside the admin area.
    RedirectToAdmin,
    /// Everything else, including every anonymous request.
    Forward,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, is_authenticated: bool, is_superuser: bool) -> Self {
        Self {
            path: path.into(),
            is_authenticated,
            is_superuser,
        }
    }

    pub fn from_viewer(path: impl Into<String>, viewer: &Viewer) -> Self {
        Self::new(path, viewer.is_authenticated(), viewer.is_superuser())
    }

    pub fn is_admin_area(&self) -> bool {
        self.path.starts_with(ADMIN_PREFIX)
    }

    /// First matching rule wins.
    pub fn decide(&self) -> AccessDecision {
        let in_admin = self.is_admin_area();

        if in_admin && self.is_authenticated && !self.is_superuser {
            AccessDecision::RenderHome
        } else if !in_admin && self.is_authenticated && self.is_superuser {
            AccessDecision::RedirectToAdmin
        } else {
            AccessDecision::Forward
        }
    }
}

/// route
///
/// Applies the policy to `ctx`. `forward` is only invoked (and awaited) for
/// [`AccessDecision::Forward`], and its response is returned untouched.
pub async fn route<F, Fut>(ctx: &RequestContext, forward: F) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Response>,
{
    let decision = ctx.decide();

    match decision {
        AccessDecision::RenderHome => {
            tracing::debug!(path = %ctx.path, ?decision, "non-superuser kept out of admin area");
            home_response(true)
        }
        AccessDecision::RedirectToAdmin => {
            tracing::debug!(path = %ctx.path, ?decision, "superuser sent to admin area");
            redirect_to_admin()
        }
        AccessDecision::Forward => forward().await,
    }
}

/// restrict_admin_user_in_frontend
///
/// Axum middleware wrapping the whole router. The requester is resolved through
/// [`Viewer`], so anonymous traffic passes straight through to `next`. The resolved viewer
/// rides along in the request extensions for the extractors downstream.
pub async fn restrict_admin_user_in_frontend(
    viewer: Viewer,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::from_viewer(request.uri().path(), &viewer);
    request.extensions_mut().insert(viewer);
    route(&ctx, || next.run(request)).await
}

/// HomeTemplate
///
/// The clinic's landing page (`templates/home.html`).
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub clinic_name: &'static str,
    pub signed_in: bool,
}

/// Renders the home page as a `200 text/html` response.
pub fn home_response(signed_in: bool) -> Response {
    let page = HomeTemplate {
        clinic_name: CLINIC_NAME,
        signed_in,
    };

    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("home template render error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `302 Found` to the admin root.
pub fn redirect_to_admin() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, ADMIN_PREFIX)]).into_response()
}
