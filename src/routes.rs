use actix_web::{error::JsonPayloadError, web, HttpRequest};
use tracing::warn;

use crate::{error::AppError, handlers};

/// Registers the `/api` routes. The `web::Data<Users>` handle must already be
/// attached to the app so each request can reach the store.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(
            web::scope("/api")
                .service(handlers::list_users)
                .service(handlers::create_user)
                .service(handlers::get_user)
                .service(handlers::get_matches)
                .service(handlers::make_visible)
                .service(handlers::make_invisible)
                .service(handlers::toggle_visible_to_all)
                .service(handlers::update_interests),
        );
}

fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Couldn't parse body of {} {}: {err}", req.method(), req.path());
    AppError::MalformedRequest("Couldn't parse the body.".to_string()).into()
}
