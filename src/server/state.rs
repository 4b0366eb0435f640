use std::sync::Arc;
use std::time::Instant;

use crate::apikey::ApiKeyService;
use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::delivery::EmailProvider;
use crate::email::EmailService;
use crate::queue::DeliveryQueue;
use crate::ratelimit::ApiKeyRateLimiter;
use crate::storage::{PostgresPool, Repositories};
use crate::template::TemplateService;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub templates: TemplateService,
    pub emails: EmailService,
    pub api_keys: ApiKeyService,
    pub rate_limiter: Arc<ApiKeyRateLimiter>,
    pub queue: Arc<dyn DeliveryQueue>,
    pub provider_name: &'static str,
    pub provider_simulated: bool,
    pub postgres_pool: Option<PostgresPool>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        repositories: Repositories,
        queue: Arc<dyn DeliveryQueue>,
        provider: &dyn EmailProvider,
        postgres_pool: Option<PostgresPool>,
    ) -> Self {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));
        let templates = TemplateService::new(repositories.templates);
        let emails = EmailService::new(
            templates.clone(),
            repositories.send_records,
            queue.clone(),
            settings.email.from_email.clone(),
        );
        let api_keys = ApiKeyService::new(repositories.api_keys);

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            templates,
            emails,
            api_keys,
            rate_limiter: Arc::new(ApiKeyRateLimiter::new()),
            queue,
            provider_name: provider.name(),
            provider_simulated: provider.is_simulated(),
            postgres_pool,
            start_time: Instant::now(),
        }
    }
}
