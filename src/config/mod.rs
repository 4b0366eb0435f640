mod settings;

pub use settings::{
    DatabaseConfig, EmailConfig, JwtConfig, OtelConfig, QueueConfig, RedisConfig, SeedConfig,
    ServerConfig, Settings,
};
