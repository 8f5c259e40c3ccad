use actix_multipart::form::MultipartForm;
use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use pushkind_common::domain::auth::AuthenticatedUser;
use pushkind_common::models::config::CommonServerConfig;
use pushkind_common::routes::{base_context, redirect, render_template};
use tera::Tera;

use crate::cache::RuleCache;
use crate::forms::rules::{AddRuleForm, EditRuleForm, UploadRulesForm};
use crate::repository::DieselRepository;
use crate::services::ServiceError;
use crate::services::rules::{
    RuleHistoryQuery, RulesQuery, create_rule, import_rules, load_rule_history, load_rules,
    modify_rule, remove_rule,
};

#[get("/rules")]
pub async fn show_rules(
    params: web::Query<RulesQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<CommonServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match load_rules(repo.get_ref(), &user, params.0) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "rules",
                &server_config.auth_service_url,
            );
            context.insert("rules", &data.rules);
            context.insert("search", &data.search);
            context.insert("search_action", "/rules");
            render_template(&tera, "rules/index.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Недостаточно прав.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to list pricing rules: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/rules/add")]
pub async fn add_rule(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<RuleCache>,
    form: web::Form<AddRuleForm>,
) -> impl Responder {
    match create_rule(repo.get_ref(), cache.get_ref(), &user, form.into_inner()) {
        Ok(rule) => {
            FlashMessage::success(format!("Правило «{}» добавлено.", rule.category)).send();
            redirect("/rules")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Недостаточно прав.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/rules")
        }
        Err(ServiceError::Conflict) => {
            FlashMessage::error("Правило для этой категории уже существует.").send();
            redirect("/rules")
        }
        Err(err) => {
            log::error!("Failed to create pricing rule: {err}");
            FlashMessage::error("Не удалось создать правило.").send();
            redirect("/rules")
        }
    }
}

#[post("/rules/{rule_id}/edit")]
pub async fn edit_rule(
    path: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<RuleCache>,
    form: web::Form<EditRuleForm>,
) -> impl Responder {
    let rule_id = path.into_inner();

    match modify_rule(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        rule_id,
        form.into_inner(),
    ) {
        Ok(rule) => {
            FlashMessage::success(format!("Правило «{}» изменено.", rule.category)).send();
            redirect("/rules")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Недостаточно прав.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/rules")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Правило не найдено или уже удалено.").send();
            redirect("/rules")
        }
        Err(err) => {
            log::error!("Failed to modify pricing rule {rule_id}: {err}");
            FlashMessage::error("Не удалось изменить правило.").send();
            redirect("/rules")
        }
    }
}

#[post("/rules/{rule_id}/delete")]
pub async fn delete_rule(
    path: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<RuleCache>,
) -> impl Responder {
    let rule_id = path.into_inner();

    match remove_rule(repo.get_ref(), cache.get_ref(), &user, rule_id) {
        Ok(()) => {
            FlashMessage::success("Правило удалено.").send();
            redirect("/rules")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Недостаточно прав.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Правило не найдено или уже удалено.").send();
            redirect("/rules")
        }
        Err(err) => {
            log::error!("Failed to delete pricing rule {rule_id}: {err}");
            FlashMessage::error("Не удалось удалить правило.").send();
            redirect("/rules")
        }
    }
}

#[post("/rules/upload")]
pub async fn upload_rules(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<RuleCache>,
    MultipartForm(form): MultipartForm<UploadRulesForm>,
) -> impl Responder {
    match import_rules(repo.get_ref(), cache.get_ref(), &user, form) {
        Ok(count) => {
            FlashMessage::success(format!("Импортировано правил: {count}.")).send();
            redirect("/rules")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Недостаточно прав.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/rules")
        }
        Err(err) => {
            log::error!("Failed to import pricing rules: {err}");
            FlashMessage::error("Не удалось импортировать правила.").send();
            redirect("/rules")
        }
    }
}

#[get("/rules/{rule_id}/history")]
pub async fn show_rule_history(
    path: web::Path<i32>,
    params: web::Query<RuleHistoryQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<CommonServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let rule_id = path.into_inner();

    match load_rule_history(repo.get_ref(), &user, rule_id, params.0) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "rules",
                &server_config.auth_service_url,
            );
            context.insert("rule", &data.rule);
            context.insert("changes", &data.changes);
            render_template(&tera, "rules/history.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Недостаточно прав.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Правило не найдено или уже удалено.").send();
            redirect("/rules")
        }
        Err(err) => {
            log::error!("Failed to load history for pricing rule {rule_id}: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
