use actix_web::{HttpResponse, Responder, get, web};
use pushkind_common::domain::auth::AuthenticatedUser;

use crate::cache::RuleCache;
use crate::repository::DieselRepository;
use crate::services::pricing::{QuoteQuery, quote_credit_cost};
use crate::services::rules::RulesQuery;
use crate::services::{ServiceError, rules as rules_service};

#[get("/v1/quote")]
/// Return a JSON credit-cost breakdown for a service request.
///
/// The quote always resolves: missing rules fall back to the built-in
/// defaults and an unreachable store degrades to the cached snapshot.
pub async fn api_v1_quote(
    params: web::Query<QuoteQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<RuleCache>,
) -> impl Responder {
    let breakdown = quote_credit_cost(repo.get_ref(), cache.get_ref(), &user, params.0);
    HttpResponse::Ok().json(breakdown)
}

#[get("/v1/rules")]
/// Return a JSON list of pricing rules with optional search and pagination.
///
/// Users without the role stored in `crate::SERVICE_ACCESS_ROLE` receive a
/// `401 Unauthorized` response.
pub async fn api_v1_rules(
    params: web::Query<RulesQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match rules_service::load_rules(repo.get_ref(), &user, params.0) {
        Ok(response) => HttpResponse::Ok().json(response.rules),
        Err(ServiceError::Unauthorized) => HttpResponse::Unauthorized().finish(),
        Err(err) => {
            log::error!("Failed to list pricing rules: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
