use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, http::header};
use futures_util::future::{LocalBoxFuture, ready, Ready};
use std::rc::Rc;

/// Response hardening headers. Media may be served from a separate origin
/// (S3/CDN), which has to be allowed in `img-src`.
#[derive(Clone, Default)]
pub struct SecurityHeaders {
    pub enable_hsts: bool,
    pub media_origin: Option<String>,
}

impl SecurityHeaders {
    pub fn from_env() -> Self {
        let enable_hsts = std::env::var("ENABLE_HSTS").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let media_origin = std::env::var("MEDIA_ORIGIN").ok().filter(|o| !o.trim().is_empty());
        Self { enable_hsts, media_origin }
    }

    pub fn with_hsts(mut self, enable: bool) -> Self {
        self.enable_hsts = enable;
        self
    }

    pub fn with_media_origin(mut self, origin: impl Into<String>) -> Self {
        self.media_origin = Some(origin.into());
        self
    }

    pub fn content_security_policy(&self) -> String {
        let img_src = match &self.media_origin {
            Some(origin) => format!("img-src 'self' data: {}", origin.trim_end_matches('/')),
            None => "img-src 'self' data:".to_string(),
        };
        // swagger-ui at /docs needs inline styles
        format!("default-src 'self'; {img_src}; style-src 'self' 'unsafe-inline'; object-src 'none'; base-uri 'none'; frame-ancestors 'none'; form-action 'self'")
    }
}

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
        let csp = header::HeaderValue::from_str(&self.content_security_policy())
            .unwrap_or_else(|_| header::HeaderValue::from_static("default-src 'self'"));
        ready(Ok(SecurityHeadersMiddleware {
            service: Rc::new(service),
            csp,
            enable_hsts: self.enable_hsts,
        }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
    csp: header::HeaderValue,
    enable_hsts: bool,
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

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let csp = self.csp.clone();
        let enable_hsts = self.enable_hsts;
        Box::pin(async move {
            let mut res = svc.call(req).await?;
            let headers = res.response_mut().headers_mut();
            let defaults = [
                (header::CONTENT_SECURITY_POLICY, csp),
                (header::REFERRER_POLICY, header::HeaderValue::from_static("no-referrer")),
                (header::X_CONTENT_TYPE_OPTIONS, header::HeaderValue::from_static("nosniff")),
                (header::X_FRAME_OPTIONS, header::HeaderValue::from_static("DENY")),
            ];
            for (name, value) in defaults {
                if !headers.contains_key(&name) {
                    headers.insert(name, value);
                }
            }
            if enable_hsts && !headers.contains_key(header::STRICT_TRANSPORT_SECURITY) {
                headers.insert(header::STRICT_TRANSPORT_SECURITY, header::HeaderValue::from_static("max-age=63072000; includeSubDomains"));
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_origin_is_allowed_for_images() {
        let csp = SecurityHeaders::default().with_media_origin("https://cdn.folioo.com/").content_security_policy();
        assert!(csp.contains("img-src 'self' data: https://cdn.folioo.com;"));
        let plain = SecurityHeaders::default().content_security_policy();
        assert!(plain.contains("img-src 'self' data:;"));
    }
}
