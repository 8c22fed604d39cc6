use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::base_system::account::{self, Account};
use crate::base_system::context::Config;
use crate::network_parser::network::{AsmrApi, Session};

/// 取得登录会话：优先使用保存的账号，失败则删除并重新询问。
pub(super) async fn sign_in(
    api: &AsmrApi,
    config: &Config,
    data_dir: Option<&Path>,
) -> Result<Session> {
    let mut saved = if config.remember_account {
        account::load(data_dir).context("读取 account.yml 失败")?
    } else {
        None
    };

    loop {
        let acct = match saved.take() {
            Some(acct) => acct,
            None => prompt_account()?,
        };

        if acct.is_anonymous() {
            if config.remember_account {
                account::save(data_dir, &acct).context("保存 account.yml 失败")?;
            }
            println!("Anonymous mode.");
            return Ok(Session::anonymous());
        }

        match api.login(acct.username.trim(), &acct.password).await {
            Ok(session) => {
                if config.remember_account {
                    account::save(data_dir, &acct).context("保存 account.yml 失败")?;
                }
                println!("Logged in as {}.", session.username().unwrap_or_default());
                return Ok(session);
            }
            Err(err) => {
                warn!(target: "noui", "登录失败: {}", err);
                println!("Login failed: {err}");
                account::forget(data_dir).context("删除 account.yml 失败")?;
            }
        }
    }
}

fn prompt_account() -> Result<Account> {
    let username = super::read_line("Username (leave empty to skip login): ")?;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Ok(Account::default());
    }
    let password = super::read_line("Password: ")?;
    Ok(Account {
        username,
        password: password.trim_end_matches(['\r', '\n']).to_string(),
    })
}
