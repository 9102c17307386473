/// JWT Authentication Middleware
///
/// Runs the token validator for one expected token type before the
/// wrapped handler and stores the resolved `Claims` in request extensions.
/// Rejections are rendered here as a regular 401 response so outer
/// middleware (CORS headers, request logging) still sees them.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage, HttpResponse, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{TokenType, TokenValidator};
use crate::error::{AppError, AuthError};

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Guard for routes that need a live token of a given type
pub struct JwtMiddleware {
    validator: TokenValidator,
    expected: TokenType,
}

impl JwtMiddleware {
    /// Require a live access token.
    pub fn access(validator: TokenValidator) -> Self {
        Self {
            validator,
            expected: TokenType::Access,
        }
    }

    /// Require a live refresh token.
    pub fn refresh(validator: TokenValidator) -> Self {
        Self {
            validator,
            expected: TokenType::Refresh,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            validator: self.validator.clone(),
            expected: self.expected,
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    validator: TokenValidator,
    expected: TokenType,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = bearer_token(req.headers()).map(str::to_string);
        let service = self.service.clone();
        let validator = self.validator.clone();
        let expected = self.expected;

        Box::pin(async move {
            let result = match token {
                None => Err(AppError::Auth(AuthError::MissingToken)),
                Some(token) => validator.validate(&token, expected).await,
            };

            match result {
                Ok(claims) => {
                    tracing::debug!(
                        sub = %claims.sub,
                        jti = %claims.jti,
                        token_type = %claims.token_type,
                        "JWT validated successfully"
                    );
                    req.extensions_mut().insert(claims);
                    service.call(req).await.map(|res| res.map_into_left_body())
                }
                Err(e) => {
                    let response: HttpResponse = e.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
