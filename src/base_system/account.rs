//! 账号信息持久化（account.yml）。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config::ConfigError;

const FILE_NAME: &str = "account.yml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

impl Account {
    /// 用户名为空表示匿名使用，不登录。
    pub fn is_anonymous(&self) -> bool {
        self.username.trim().is_empty()
    }
}

pub fn account_path(base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) => base.join(FILE_NAME),
        None => PathBuf::from(FILE_NAME),
    }
}

pub fn load(base_dir: Option<&Path>) -> Result<Option<Account>, ConfigError> {
    let path = account_path(base_dir);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let account: Account =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
    Ok(Some(account))
}

pub fn save(base_dir: Option<&Path>, account: &Account) -> Result<(), ConfigError> {
    let path = account_path(base_dir);
    let yaml =
        serde_yaml::to_string(account).map_err(|err| ConfigError::Validation(err.to_string()))?;
    fs::write(&path, yaml).map_err(|source| ConfigError::Io { path, source })
}

/// 登录失败后删除保存的账号，下次重新询问。
pub fn forget(base_dir: Option<&Path>) -> Result<(), ConfigError> {
    let path = account_path(base_dir);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}
