use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub paging: PagingConfig,
    pub pipeline: PipelineConfig,
    pub tenant: TenantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Page size used when none is requested, and the cap for requested sizes
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub slow_request_threshold_ms: u64,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Principal claim holding the owner id of tenant-scoped rows
    pub owner_claim: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Paging overrides
        if let Ok(v) = env::var("PAGING_MAX_PAGE_SIZE") {
            self.paging.max_page_size = v.parse().unwrap_or(self.paging.max_page_size);
        }

        // Pipeline overrides
        if let Ok(v) = env::var("PIPELINE_SLOW_REQUEST_MS") {
            self.pipeline.slow_request_threshold_ms =
                v.parse().unwrap_or(self.pipeline.slow_request_threshold_ms);
        }
        if let Ok(v) = env::var("PIPELINE_DEBUG_LOGGING") {
            self.pipeline.debug_logging = v.parse().unwrap_or(self.pipeline.debug_logging);
        }

        // Tenant overrides
        if let Ok(v) = env::var("TENANT_OWNER_CLAIM") {
            let claim = v.trim();
            if !claim.is_empty() {
                self.tenant.owner_claim = claim.to_string();
            }
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            paging: PagingConfig { max_page_size: 100 },
            pipeline: PipelineConfig {
                slow_request_threshold_ms: 100,
                debug_logging: true,
            },
            tenant: TenantConfig {
                owner_claim: "sub".to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            paging: PagingConfig { max_page_size: 100 },
            pipeline: PipelineConfig {
                slow_request_threshold_ms: 500,
                debug_logging: false,
            },
            tenant: TenantConfig {
                owner_claim: "sub".to_string(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            paging: PagingConfig { max_page_size: 100 },
            pipeline: PipelineConfig {
                slow_request_threshold_ms: 1000,
                debug_logging: false,
            },
            tenant: TenantConfig {
                owner_claim: "sub".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macro for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
