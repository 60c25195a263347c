// src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::config::{AppState, Settings};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env().expect("Configuração inválida.");

    let db_pool = config::connect(&settings)
        .await
        .expect("Falha ao conectar ao banco de dados.");

    // As migrações precisam rodar antes do catálogo ser carregado
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app_state = AppState::new(&settings, db_pool)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    match listener.local_addr() {
        Ok(addr) => tracing::info!("🚀 Servidor escutando em {}", addr),
        Err(_) => tracing::info!("🚀 Servidor escutando em {}", settings.bind_addr),
    }
    tracing::info!("📖 Documentação em /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
