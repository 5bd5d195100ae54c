//! 住院管理命令行工具
//!
//! 每次调用加载快照、执行一个命令，有修改时写回快照，结果以JSON输出到stdout。

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use inpatient_admin::{init_logging, ConfigManager};
use inpatient_store::SnapshotFile;
use inpatient_workflow::InpatientEngine;
use tracing::{error, info};

/// 住院管理命令行参数
#[derive(Parser, Debug)]
#[command(name = "inpatient")]
#[command(about = "住院管理：登记、床位、手术、开票与看板")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "inpatient.toml")]
    config: String,

    /// 快照文件路径，覆盖配置中的 store.snapshot_path
    #[arg(short, long)]
    store: Option<String>,

    /// 日志级别，覆盖配置中的 logging.level
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(&args.config)?;
    let mut config = manager.get_config().await;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // 初始化日志
    init_logging(&config.logging)?;

    let snapshot = SnapshotFile::new(args.store.unwrap_or_else(|| config.store.snapshot_path.clone()));
    let mut store = snapshot
        .load()
        .await
        .with_context(|| format!("Failed to load snapshot {}", snapshot.path().display()))?;
    store
        .sequence_mut()
        .configure(&config.sequence.prefix, config.sequence.padding);
    store.ledger_mut().set_currency(&config.billing.currency);

    let mut engine = InpatientEngine::new(store, config.workflow_settings());

    let output = match commands::run(&mut engine, args.command) {
        Ok(output) => output,
        Err(e) => {
            error!("Command failed: {:#}", e);
            return Err(e);
        }
    };

    if output.mutated {
        snapshot
            .save(engine.store())
            .await
            .with_context(|| format!("Failed to save snapshot {}", snapshot.path().display()))?;
        info!("Snapshot saved to {}", snapshot.path().display());
    }

    println!("{}", serde_json::to_string_pretty(&output.value)?);
    Ok(())
}
