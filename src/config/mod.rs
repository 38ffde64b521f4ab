mod settings;

pub use settings::{
    ChatConfig, DatabaseConfig, EmailConfig, InAppConfig, LoggingConfig, RetryConfig,
    SchedulerConfig, ServerConfig, Settings,
};
