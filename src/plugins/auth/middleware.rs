use axum::http::Request;
use axum::response::Response;
use axum::middleware::Next;
use axum::body::Body;

use crate::http_error::AppError;
use crate::plugins::auth::handlers::authenticate;

pub async fn require_auth(mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let auth = authenticate(req.headers(), req.extensions()).await?;
    // insert into extensions for handlers to use
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}
