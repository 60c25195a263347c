// src/services/auth.rs

use std::sync::Arc;

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    db::OpportunityStore,
    models::{auth::Claims, catalog::User},
};

/// Valida os tokens emitidos pelo provedor de autenticação hospedado.
/// Login e cadastro acontecem lá; aqui só conferimos a assinatura e o usuário.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn OpportunityStore>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(store: Arc<dyn OpportunityStore>, jwt_secret: String) -> Self {
        Self { store, jwt_secret }
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.store
            .find_user(token_data.claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::token_for;
    use super::*;
    use crate::db::MemoryStore;
    use uuid::Uuid;

    const SECRET: &str = "segredo-de-teste";

    #[tokio::test]
    async fn test_valid_token_resolves_user() {
        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user("Ana", "ana@grupo.com").await;
        let service = AuthService::new(store, SECRET.to_string());

        let resolved = service.validate_token(&token_for(user.id, SECRET, 3600)).await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn test_token_rejections() {
        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user("Ana", "ana@grupo.com").await;
        let service = AuthService::new(store, SECRET.to_string());

        let wrong_secret = token_for(user.id, "outro-segredo", 3600);
        assert!(matches!(service.validate_token(&wrong_secret).await, Err(AppError::InvalidToken)));

        let expired = token_for(user.id, SECRET, -3600);
        assert!(matches!(service.validate_token(&expired).await, Err(AppError::InvalidToken)));

        let unknown = token_for(Uuid::new_v4(), SECRET, 3600);
        assert!(matches!(service.validate_token(&unknown).await, Err(AppError::UserNotFound)));
    }
}
