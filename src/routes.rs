// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    let catalog_routes = Router::new()
        .route("/companies"
               ,get(handlers::catalog::list_companies)
               .post(handlers::catalog::create_company)
        )
        .route("/partners"
               ,get(handlers::catalog::list_partners)
               .post(handlers::catalog::create_partner)
        )
        .route("/statuses"
               ,get(handlers::catalog::list_statuses)
               .post(handlers::catalog::create_status)
        )
        .route("/users", get(handlers::catalog::list_users))
        .route("/refresh", post(handlers::catalog::refresh_catalog));

    let opportunity_routes = Router::new()
        .route("/"
               ,get(handlers::opportunities::list_opportunities)
               .post(handlers::opportunities::create_opportunity)
        )
        .route("/{id}"
               ,get(handlers::opportunities::get_opportunity)
               .put(handlers::opportunities::update_opportunity)
               .delete(handlers::opportunities::delete_opportunity)
        )
        .route("/{id}/observations"
               ,get(handlers::opportunities::list_observations)
               .post(handlers::opportunities::add_observation)
        );

    let dashboard_routes = Router::new()
        .route("/overview", get(handlers::dashboard::get_overview))
        .route("/companies", get(handlers::dashboard::get_company_stats))
        .route("/partners", get(handlers::dashboard::get_partner_stats));

    // Tudo em /api, exceto /api/health, exige o token do provedor de autenticação
    let protected = Router::new()
        .nest("/api/catalog", catalog_routes)
        .nest("/api/opportunities", opportunity_routes)
        .nest("/api/dashboard", dashboard_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::health))
        .merge(protected)
        .with_state(app_state)
}
