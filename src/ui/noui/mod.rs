//! 命令行交互入口。
//!
//! 命令行给出作品编号时逐个下载后退出；否则从标准输入循环读取编号，空行退出。

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, warn};

use crate::base_system::context::Config;
use crate::base_system::work_code::parse_work_code;
use crate::network_parser::network::{AsmrApi, AuthedClient};

mod account;
mod download;

const WRONG_FORMAT: &str = "Wrong format RJ code. Enter xxx or RJxxx.";

pub fn run(config: &Config, data_dir: Option<&Path>, codes: &[String]) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("创建 tokio runtime 失败")?;
    runtime.block_on(run_async(config, data_dir, codes))
}

async fn run_async(config: &Config, data_dir: Option<&Path>, codes: &[String]) -> Result<()> {
    println!(
        "asmr-downloader v{}\n默认保存到: {}",
        env!("CARGO_PKG_VERSION"),
        config.default_save_dir().display()
    );

    let api = AsmrApi::new(config).context("初始化 HTTP 客户端失败")?;
    let session = account::sign_in(&api, config, data_dir).await?;
    let client = api.with_session(session);

    if codes.is_empty() {
        interactive(&client, config).await?;
    } else {
        for raw in codes {
            match parse_work_code(raw) {
                Some(code) => run_one(&client, config, &code).await,
                None => println!("{WRONG_FORMAT} ({raw})"),
            }
        }
    }

    if client.session().is_logged_in()
        && let Err(err) = api.logout(client.session()).await
    {
        warn!(target: "noui", "注销失败: {}", err);
    }
    Ok(())
}

async fn interactive(client: &AuthedClient, config: &Config) -> Result<()> {
    loop {
        let input = read_line("RJ code (empty line to exit): ")?;
        let text = input.trim();
        if text.is_empty() {
            println!("Exit.");
            return Ok(());
        }
        match parse_work_code(text) {
            Some(code) => run_one(client, config, &code).await,
            None => println!("{WRONG_FORMAT}"),
        }
    }
}

async fn run_one(client: &AuthedClient, config: &Config, code: &str) {
    println!("开始下载 RJ{}", code);
    if let Err(err) = download::download_work(client, config, code).await {
        error!(target: "noui", "{:#}", err);
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line)
}
