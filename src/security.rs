use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
};

/// Security headers middleware
pub struct SecurityHeaders;

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            let mut res = srv.call(req).await?;
            let headers = res.headers_mut();

            headers.insert(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            );
            headers.insert(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            );
            headers.insert(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("no-referrer"),
            );
            // JSON only, nothing to load
            headers.insert(
                HeaderName::from_static("content-security-policy"),
                HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
            );
            headers.insert(
                HeaderName::from_static("cache-control"),
                HeaderValue::from_static("no-store"),
            );

            if cfg!(not(debug_assertions)) {
                headers.insert(
                    HeaderName::from_static("strict-transport-security"),
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                );
            }

            Ok(res)
        })
    }
}

/// Input validation utilities
pub mod validation {
    use regex::Regex;
    use std::sync::OnceLock;

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    static CURRENCY_REGEX: OnceLock<Regex> = OnceLock::new();

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<(), String> {
        if email.is_empty() {
            return Err("Email cannot be empty".to_string());
        }

        if email.len() > 254 {
            return Err("Email too long (max 254 characters)".to_string());
        }

        let email_regex = EMAIL_REGEX.get_or_init(|| {
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                .expect("email pattern is valid")
        });

        if !email_regex.is_match(email) {
            return Err("Invalid email format".to_string());
        }

        Ok(())
    }

    /// Three upper-case letters, e.g. USD
    pub fn validate_currency(code: &str) -> Result<(), String> {
        let currency_regex = CURRENCY_REGEX
            .get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("currency pattern is valid"));

        if !currency_regex.is_match(code) {
            return Err("Currency must be a three-letter ISO code".to_string());
        }

        Ok(())
    }

    /// Free text that ends up in emails: bounded length, no markup
    pub fn validate_display_text(text: &str, max_len: usize) -> Result<(), String> {
        if text.chars().count() > max_len {
            return Err(format!("Too long (max {} characters)", max_len));
        }

        if text.contains('<') || text.contains('>') || text.contains('"') || text.contains('\'') {
            return Err("Contains invalid characters".to_string());
        }

        if text.chars().any(|c| c.is_control()) {
            return Err("Contains control characters".to_string());
        }

        Ok(())
    }

}

pub use actix_governor::{GovernorConfig, GovernorConfigBuilder};

/// Rate limiting for the API scope, keyed by peer IP
pub fn create_rate_limiter() -> Option<
    GovernorConfig<
        actix_governor::PeerIpKeyExtractor,
        actix_governor::governor::middleware::StateInformationMiddleware,
    >,
> {
    GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(20)
        .use_headers()
        .finish()
}
