//! 配置管理
//!
//! 分层加载配置文件和环境变量，支持校验、按路径读写和保存

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use inpatient_workflow::WorkflowSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::logging::LogFormat;

/// 环境变量前缀，例如 `INPATIENT__BILLING__CURRENCY=USD`
pub const ENV_PREFIX: &str = "INPATIENT";

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<InpatientConfig>>,
    /// 配置文件路径
    config_path: PathBuf,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 住院系统完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InpatientConfig {
    /// 存储配置
    pub store: StoreConfig,
    /// 序列号配置
    pub sequence: SequenceConfig,
    /// 账单配置
    pub billing: BillingConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 快照文件路径
    pub snapshot_path: String,
}

/// 序列号配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub prefix: String,
    /// 数字部分位数
    pub padding: usize,
}

/// 账单配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// 账单币种
    pub currency: String,
    /// 住院费账单行名称
    pub rent_line_label: String,
    /// 已开票的住院记录再次开票时报错
    pub reject_reinvoice: bool,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别，EnvFilter 语法
    pub level: String,
    /// 日志格式：pretty、compact 或 json
    pub format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "./data/inpatient.json".to_string(),
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            prefix: "IP".to_string(),
            padding: 5,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            rent_line_label: "Room/Bed Rent Amount".to_string(),
            reject_reinvoice: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl InpatientConfig {
    /// 工作流引擎使用的设置
    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            rent_line_label: self.billing.rent_line_label.clone(),
            reject_reinvoice: self.billing.reject_reinvoice,
        }
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&InpatientConfig) -> Result<()>,
}

impl ConfigManager {
    /// 创建新的配置管理器，配置文件不存在时使用默认值
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref().to_path_buf();
        let config = Self::load_config(&config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
            validator,
        })
    }

    /// 从文件和环境变量加载配置
    fn load_config(config_path: &Path) -> Result<InpatientConfig> {
        let settings = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: InpatientConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        info!("Configuration loaded from: {}", config_path.display());
        Ok(config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 获取配置
    pub async fn get_config(&self) -> InpatientConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 更新配置并写回文件
    pub async fn update_config(&self, new_config: InpatientConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        {
            let mut config = self.config.write().await;
            *config = new_config;
        }

        self.save_config().await?;

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 保存配置到文件
    pub async fn save_config(&self) -> Result<()> {
        let config = self.config.read().await;
        let config_str = toml::to_string_pretty(&*config).context("Failed to serialize configuration")?;

        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create configuration directory")?;
        }
        tokio::fs::write(&self.config_path, config_str)
            .await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", self.config_path.display());
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(&self.config_path)?;
        self.validator.validate(&new_config)?;
        *self.config.write().await = new_config;
        Ok(())
    }

    /// 按点分路径读取配置值，例如 `billing.currency`
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.read().await;
        let config_json = serde_json::to_value(&*config).context("Failed to serialize config to JSON")?;
        let value = extract_nested_value(&config_json, path)
            .with_context(|| format!("Configuration path not found: {}", path))?;

        serde_json::from_value(value.clone()).context("Failed to deserialize configuration value")
    }

    /// 按点分路径设置配置值，校验通过后才生效
    pub async fn set_value<T>(&self, path: &str, value: T) -> Result<()>
    where
        T: Serialize,
    {
        let value_json = serde_json::to_value(value).context("Failed to serialize value")?;

        let mut config = self.config.write().await;
        let mut config_json = serde_json::to_value(&*config).context("Failed to serialize config to JSON")?;
        let slot = extract_nested_value_mut(&mut config_json, path)
            .with_context(|| format!("Configuration path not found: {}", path))?;
        *slot = value_json;

        let updated: InpatientConfig =
            serde_json::from_value(config_json).context("Invalid value for configuration path")?;
        self.validator.validate(&updated)?;
        *config = updated;

        info!("Configuration value updated: {}", path);
        Ok(())
    }

    /// 验证当前配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

fn extract_nested_value<'a>(root: &'a serde_json::Value, path: &str) -> Result<&'a serde_json::Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current
            .as_object()
            .and_then(|map| map.get(part))
            .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
    }
    Ok(current)
}

fn extract_nested_value_mut<'a>(root: &'a mut serde_json::Value, path: &str) -> Result<&'a mut serde_json::Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current
            .as_object_mut()
            .and_then(|map| map.get_mut(part))
            .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
    }
    Ok(current)
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "store.snapshot_path",
                validator: |config| {
                    if config.store.snapshot_path.trim().is_empty() {
                        Err(anyhow::anyhow!("Snapshot path cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "sequence.prefix",
                validator: |config| {
                    if config.sequence.prefix.is_empty() {
                        Err(anyhow::anyhow!("Sequence prefix cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "sequence.padding",
                validator: |config| {
                    if config.sequence.padding == 0 || config.sequence.padding > 12 {
                        Err(anyhow::anyhow!("Sequence padding must be between 1 and 12"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "billing.currency",
                validator: |config| {
                    if config.billing.currency.trim().is_empty() {
                        Err(anyhow::anyhow!("Billing currency cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "billing.rent_line_label",
                validator: |config| {
                    if config.billing.rent_line_label.trim().is_empty() {
                        Err(anyhow::anyhow!("Rent line label cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "logging.format",
                validator: |config| config.logging.format.parse::<LogFormat>().map(|_| ()),
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &InpatientConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(e.context(format!("Invalid configuration value at {}", rule.field_path)));
            }
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = InpatientConfig::default();
        assert_eq!(config.sequence.prefix, "IP");
        assert_eq!(config.sequence.padding, 5);
        assert_eq!(config.billing.currency, "EUR");
        assert!(!config.billing.reject_reinvoice);
        assert!(ConfigValidator::new().validate(&config).is_ok());

        let settings = config.workflow_settings();
        assert_eq!(settings.rent_line_label, "Room/Bed Rent Amount");
    }

    #[test]
    fn test_validator_rejects_bad_values() {
        let validator = ConfigValidator::new();

        let mut config = InpatientConfig::default();
        config.sequence.padding = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = InpatientConfig::default();
        config.logging.format = "xml".to_string();
        assert!(validator.validate(&config).is_err());

        let mut config = InpatientConfig::default();
        config.billing.currency = " ".to_string();
        assert!(validator.validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(dir.path().join("absent.toml")).unwrap();

        assert_eq!(manager.get_config().await.sequence, SequenceConfig::default());
    }

    #[tokio::test]
    async fn test_partial_file_and_dotted_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inpatient.toml");
        std::fs::write(
            &path,
            "[billing]\ncurrency = \"CHF\"\nreject_reinvoice = true\n\n[sequence]\nprefix = \"HOSP/\"\n",
        )
        .unwrap();

        let manager = ConfigManager::new(&path).unwrap();
        let config = manager.get_config().await;
        assert_eq!(config.billing.currency, "CHF");
        assert!(config.billing.reject_reinvoice);
        assert_eq!(config.sequence.prefix, "HOSP/");
        assert_eq!(config.sequence.padding, 5);

        let currency: String = manager.get_value("billing.currency").await.unwrap();
        assert_eq!(currency, "CHF");
        assert!(manager.get_value::<String>("billing.missing").await.is_err());

        manager.set_value("sequence.padding", 7).await.unwrap();
        let padding: usize = manager.get_value("sequence.padding").await.unwrap();
        assert_eq!(padding, 7);
        assert!(manager.set_value("sequence.padding", 0).await.is_err());
        assert!(manager.set_value("sequence.padding", "seven").await.is_err());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("inpatient.toml");
        let manager = ConfigManager::new(&path).unwrap();

        let mut config = manager.get_config().await;
        config.billing.rent_line_label = "Hospitalisation".to_string();
        manager.update_config(config).await.unwrap();
        assert!(path.exists());

        let reloaded = ConfigManager::new(&path).unwrap();
        assert_eq!(reloaded.get_config().await.billing.rent_line_label, "Hospitalisation");
    }
}
