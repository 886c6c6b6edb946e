use config::{Config, ConfigError, Environment, File, Map};
use quoteboard_core::config::AppConfig;

/// 环境变量前缀，例如 `QUOTEBOARD__SERVER__PORT=9000`
const ENV_PREFIX: &str = "QUOTEBOARD";
/// 选择环境配置文件的变量名
const ENV_NAME_VAR: &str = "QUOTEBOARD_ENV";

/// # Summary
/// 从文件与环境变量加载应用配置。
///
/// # Logic
/// 1. 可选读取 `config/default.*`。
/// 2. 可选读取 `config/{QUOTEBOARD_ENV}.*`，默认 `development`。
/// 3. 以 `QUOTEBOARD__*` 环境变量覆盖，层级分隔符为 `__`。
/// 4. 未出现的字段使用 `AppConfig::default()`。
///
/// # Returns
/// 合并后的配置。
pub fn load() -> Result<AppConfig, ConfigError> {
    let env_name = std::env::var(ENV_NAME_VAR).unwrap_or_else(|_| "development".into());
    build(&env_name, None)
}

/// 组装配置源；`env_override` 为 Some 时替代进程环境变量。
fn build(env_name: &str, env_override: Option<Map<String, String>>) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(env_override),
        )
        .build()?
        .try_deserialize()
}
