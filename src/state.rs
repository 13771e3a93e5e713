use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, EmailSender, LogEmailSender, OtpService, SeaOrmAuthService, TokenService};

#[derive(Clone)]
pub struct SharedState {
    pub store: Store,

    pub tokens: TokenService,

    pub otps: OtpService,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_mailer(config, Arc::new(LogEmailSender)).await
    }

    pub async fn with_mailer(config: Config, mailer: Arc<dyn EmailSender>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::from_store(config, store, mailer).await
    }

    pub async fn from_store(
        config: Config,
        store: Store,
        mailer: Arc<dyn EmailSender>,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let tokens = TokenService::new(store.clone(), config.auth.token_ttl());
        let otps = OtpService::new(
            store.clone(),
            config.security.clone(),
            config.auth.otp_ttl(),
        );

        let auth_service = Arc::new(
            SeaOrmAuthService::new(store.clone(), config, tokens.clone(), otps.clone(), mailer)
                .await?,
        ) as Arc<dyn AuthService>;

        Ok(Self {
            store,
            tokens,
            otps,
            auth_service,
        })
    }
}
