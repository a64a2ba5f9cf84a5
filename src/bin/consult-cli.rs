//! 留学咨询 CLI 客户端（测试版）
//!
//! 非交互式 CLI，用于测试和展示 SDK 功能
//! 启动时通过命令行参数指定账号，自动登录，展示消息、时间线和顾问信息

use anyhow::Result;
use clap::Parser;
use consult_sdk_core_rust::consult::session::SessionListener;
use consult_sdk_core_rust::consult::timeline::TimelineView;
use consult_sdk_core_rust::{login_async, ClientConfig, ConsultClient};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// 留学咨询 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "consult-cli")]
#[command(about = "留学咨询 CLI 客户端 - 用于测试和展示 SDK 功能", long_about = None)]
struct Args {
    /// 登录邮箱
    #[arg(short, long, env = "CONSULT_EMAIL")]
    email: String,

    /// 登录密码
    #[arg(short, long, env = "CONSULT_PASSWORD", hide_env_values = true)]
    password: String,

    /// 只展示指定申请的时间线；不指定时展示全部申请
    #[arg(short, long)]
    application_id: Option<String>,

    /// 只校验账号密码，不启动客户端
    #[arg(long)]
    check_login: bool,

    /// 运行时长（秒），0 表示展示完立即退出
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// 日志级别（默认: info,consult_sdk_core_rust=debug）
    #[arg(long, default_value = "info,consult_sdk_core_rust=debug")]
    log_level: String,
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("consult-debug.log")
        .map_err(|e| anyhow::anyhow!("无法创建日志文件 consult-debug.log: {}", e))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: consult-debug.log");
    Ok(())
}

struct CliSessionListener;

#[async_trait::async_trait]
impl SessionListener for CliSessionListener {
    async fn on_session_expiring(&self, remaining_secs: i64) {
        warn!("[CLI/Session] ⏳ 登录将在 {} 秒后过期", remaining_secs);
    }

    async fn on_session_expired(&self) {
        error!("[CLI/Session] ⛔ 登录已过期，已自动登出");
    }
}

fn print_timeline(application_id: &str, view: &TimelineView) {
    match view {
        TimelineView::NoEvents => info!("[CLI] 🗂️ 申请 {}：暂无进度", application_id),
        TimelineView::Events(entries) => {
            info!("[CLI] 🗂️ 申请 {}（共 {} 条进度）:", application_id, entries.len());
            for entry in entries {
                info!(
                    "[CLI]   - {} | {} [{} / {}] {}",
                    entry.event.date.format("%Y-%m-%d"),
                    entry.event.status,
                    entry.bucket.icon(),
                    entry.bucket.color(),
                    entry.event.note.as_deref().unwrap_or("")
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level)?;

    let config = ClientConfig::from_env().map_err(|e| anyhow::anyhow!("读取配置失败: {}", e))?;
    info!("[CLI] 🚀 留学咨询 CLI 客户端（测试模式）");
    info!("[CLI] 🌐 服务地址: {}", config.api_base_url);
    info!("[CLI] 📧 账号: {}", args.email);

    if args.check_login {
        let session = login_async(
            &config.api_base_url,
            &config.anon_key,
            &args.email,
            &args.password,
            config.request_timeout,
        )
        .await
        .map_err(|e| anyhow::anyhow!("登录失败: {}", e))?;
        info!(
            "[CLI] ✅ 账号可用，用户ID: {}，角色: {}，过期时间: {:?}",
            session.user.id,
            session.user.role().as_str(),
            session.expiry()
        );
        return Ok(());
    }

    let mut client = ConsultClient::with_listener(config, Arc::new(CliSessionListener))
        .map_err(|e| anyhow::anyhow!("创建客户端失败: {}", e))?;

    info!("[CLI] 🔐 正在登录...");
    let session = client
        .sign_in(&args.email, &args.password)
        .await
        .map_err(|e| anyhow::anyhow!("登录失败: {}", e))?;
    info!(
        "[CLI] ✅ 登录成功！用户: {}（{}）",
        session.user.display_name(),
        session.user.role().as_str()
    );

    client
        .init()
        .await
        .map_err(|e| anyhow::anyhow!("初始化失败: {}", e))?;

    match client.get_message_feed().await {
        Ok(feed) => {
            info!("[CLI] 💬 消息（共 {} 条）:", feed.messages.len());
            for item in feed.messages.iter().take(10) {
                info!(
                    "[CLI]   - [{}] {:?} {}: {}",
                    item.message.timestamp.format("%m-%d %H:%M"),
                    item.direction,
                    item.message.sender.name,
                    item.message.text
                );
            }
            for failure in &feed.failures {
                warn!("[CLI]   ⚠️ 聊天室 {} 拉取失败: {}", failure.room_id, failure.reason);
            }
        }
        Err(e) => error!("[CLI] ❌ 获取消息失败: {}", e),
    }

    let application_ids = match &args.application_id {
        Some(id) => vec![id.clone()],
        None => match client.list_my_applications().await {
            Ok(apps) => apps.into_iter().map(|a| a.id).collect(),
            Err(e) => {
                error!("[CLI] ❌ 获取申请列表失败: {}", e);
                Vec::new()
            }
        },
    };
    for id in &application_ids {
        match client.get_timeline(id).await {
            Ok(view) => print_timeline(id, &view),
            Err(e) => error!("[CLI] ❌ 获取申请 {} 时间线失败: {}", id, e),
        }
    }

    match client.available_advisors().await {
        Ok(advisors) => {
            info!("[CLI] 🧑‍🏫 顾问（共 {} 位）:", advisors.len());
            for advisor in &advisors {
                info!(
                    "[CLI]   - {} | 在线: {} | 接待中: {}",
                    advisor.name, advisor.is_online, advisor.active_chats
                );
            }
        }
        Err(e) => error!("[CLI] ❌ 获取顾问失败: {}", e),
    }

    if let Ok(stats) = client.destination_stats().await {
        for stat in &stats {
            info!(
                "[CLI] 📊 {} | 申请: {} | 通过率: {:.0}%",
                stat.destination,
                stat.application_count,
                stat.approval_rate() * 100.0
            );
        }
    }

    if args.duration > 0 {
        info!("[CLI] ⏰ {} 秒后自动退出", args.duration);
        sleep(Duration::from_secs(args.duration)).await;
        if let Ok(advisors) = client.available_advisors().await {
            info!("[CLI] 🧑‍🏫 最新在线顾问数: {}", advisors.iter().filter(|a| a.is_online).count());
        }
    }

    client.teardown();
    if let Err(e) = client.sign_out().await {
        warn!("[CLI] 登出失败: {}", e);
    }
    info!("[CLI] 👋 程序退出");
    Ok(())
}
