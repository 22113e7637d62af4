use std::sync::Arc;

use askama::Template;
use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::warn;

use crate::{
    application::{chrome::ChromeService, error::AppError, metadata, site::SiteService},
    domain::slug::Slug,
    presentation::views::{
        AboutTemplate, BlogTemplate, IndexTemplate, LayoutContext, Page, PostTemplate,
        TekTipTemplate, TeksTipsTemplate, render_not_found_response, render_template_response,
    },
};

use super::middleware::{log_responses, set_request_context};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub site: Arc<SiteService>,
    pub chrome: Arc<ChromeService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/blog", get(blog_index))
        .route("/blog/{slug}", get(post_detail))
        .route("/teks-tips", get(teks_tips_index))
        .route("/teks-tips/{slug}", get(tek_tip_detail))
        .route("/about", get(about))
        .route("/sitemap.xml", get(sitemap))
        .route("/_health", get(health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    match state.site.home().await {
        Ok(page) => render_page(&state, page, "/", |view| IndexTemplate { view }),
        Err(err) => app_error_response(err),
    }
}

async fn blog_index(State(state): State<HttpState>) -> Response {
    match state.site.post_listing().await {
        Ok(page) => render_page(&state, page, "/blog", |view| BlogTemplate { view }),
        Err(err) => app_error_response(err),
    }
}

async fn post_detail(State(state): State<HttpState>, Path(raw): Path<String>) -> Response {
    let path = format!("/blog/{raw}");
    let Some(slug) = Slug::parse(&raw) else {
        return not_found(&state, &path);
    };

    match state.site.post_detail(&slug).await {
        Ok(Some(page)) => render_page(&state, page, &path, |view| PostTemplate { view }),
        Ok(None) => not_found(&state, &path),
        Err(err) => app_error_response(err),
    }
}

async fn teks_tips_index(State(state): State<HttpState>) -> Response {
    match state.site.tutorial_listing().await {
        Ok(page) => render_page(&state, page, "/teks-tips", |view| TeksTipsTemplate { view }),
        Err(err) => app_error_response(err),
    }
}

async fn tek_tip_detail(State(state): State<HttpState>, Path(raw): Path<String>) -> Response {
    let path = format!("/teks-tips/{raw}");
    let Some(slug) = Slug::parse(&raw) else {
        return not_found(&state, &path);
    };

    match state.site.tutorial_detail(&slug).await {
        Ok(Some(page)) => render_page(&state, page, &path, |view| TekTipTemplate { view }),
        Ok(None) => not_found(&state, &path),
        Err(err) => app_error_response(err),
    }
}

async fn about(State(state): State<HttpState>) -> Response {
    render_page(&state, state.site.about(), "/about", |view| AboutTemplate { view })
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state
        .site
        .sitemap_xml(state.chrome.public_site_url())
        .await
    {
        Ok(body) => {
            let mut response = (StatusCode::OK, body).into_response();
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            );
            set_cache_control(&state, &mut response);
            response
        }
        Err(err) => app_error_response(err),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback(State(state): State<HttpState>, request: Request<Body>) -> Response {
    not_found(&state, request.uri().path())
}

fn render_page<C, T>(
    state: &HttpState,
    page: Page<C>,
    path: &str,
    template: impl FnOnce(LayoutContext<C>) -> T,
) -> Response
where
    T: Template,
{
    let chrome = state.chrome.layout(page.meta, path);
    let view = LayoutContext::new(chrome, page.content);
    let mut response = render_template_response(template(view), StatusCode::OK);
    if response.status().is_success() {
        set_cache_control(state, &mut response);
    }
    response
}

fn not_found(state: &HttpState, path: &str) -> Response {
    render_not_found_response(state.chrome.layout(metadata::not_found_meta(), path))
}

fn set_cache_control(state: &HttpState, response: &mut Response) {
    let policy = state.site.revalidate().cache_control();
    match HeaderValue::from_str(&policy) {
        Ok(value) => {
            response.headers_mut().insert(CACHE_CONTROL, value);
        }
        Err(err) => warn!(target = SOURCE, error = %err, "Invalid Cache-Control value"),
    }
}

fn app_error_response(err: AppError) -> Response {
    let mut response = err.into_response();
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
