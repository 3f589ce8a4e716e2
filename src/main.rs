// ==========================================
// 商品目录导入系统 - 命令行入口
// ==========================================
// 子命令: init-db / create-job / process / show / config / add-store / add-shipping-category
// 数据库: --db 或 CATALOG_IMPORTER_DB_PATH，缺省为用户数据目录
// ==========================================

use anyhow::{bail, Context, Result};
use catalog_importer::app::{get_default_db_path, AppState};
use catalog_importer::config::config_keys;
use catalog_importer::domain::{ImportJob, ImportType};
use catalog_importer::importer::ProcessOptions;
use catalog_importer::repository::{CatalogRepository, ImportRepository};
use catalog_importer::{logging, ImportState, VERSION};
use clap::{Parser, Subcommand};
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "catalog-importer")]
#[command(author, version, about = "客户/商品/订单批量导入", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite 数据库文件路径
    #[arg(long, env = "CATALOG_IMPORTER_DB_PATH", global = true)]
    db: Option<String>,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 初始化数据库表结构
    InitDb,

    /// 创建导入任务（不处理）
    CreateJob {
        /// 导入类型: customers / products / orders
        #[arg(short = 't', long = "type")]
        import_type: String,

        /// 源文件路径
        #[arg(short, long)]
        file: String,
    },

    /// 处理导入任务
    Process {
        /// 任务 ID
        job_id: String,

        /// 重新解析源文件
        #[arg(long)]
        force_scan: bool,
    },

    /// 查看任务状态与行结果
    Show {
        /// 任务 ID
        job_id: String,

        /// 同时输出导入日志
        #[arg(long)]
        logs: bool,
    },

    /// 读写导入配置（config_kv, scope=global）
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// 新增店铺（订单导入引用）
    AddStore {
        code: String,
        name: String,
        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// 新增运费类别（商品导入引用）
    AddShippingCategory { name: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 列出全部配置
    List,
    /// 设置配置项
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    if let Err(e) = run(cli).await {
        error!(error = %e, "命令执行失败");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    info!(version = VERSION, db_path = %db_path, "catalog-importer");

    let state = AppState::new(db_path.clone())
        .with_context(|| format!("无法打开数据库 {}", db_path))?;

    match cli.command {
        Commands::InitDb => {
            let version = state.schema_version()?.unwrap_or_default();
            println!("数据库已就绪: {} (schema_version={})", state.db_path, version);
        }

        Commands::CreateJob { import_type, file } => {
            let kind: ImportType = import_type
                .parse()
                .map_err(|k| anyhow::anyhow!("不支持的导入类型: {}", k))?;
            let path = std::fs::canonicalize(&file)
                .with_context(|| format!("源文件不存在: {}", file))?;

            let job = ImportJob::new(kind.as_str(), path.to_string_lossy());
            state.import_repo.insert_job(&job).await?;
            println!("{}", job.id);
        }

        Commands::Process { job_id, force_scan } => {
            let report = state
                .process_import()
                .process_by_id(&job_id, ProcessOptions { force_scan })
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.state != ImportState::Completed {
                process::exit(2);
            }
        }

        Commands::Show { job_id, logs } => {
            let job = match state.import_repo.find_job(&job_id).await? {
                Some(job) => job,
                None => bail!("导入任务不存在: {}", job_id),
            };
            println!("{}", serde_json::to_string_pretty(&job)?);
            if logs {
                let entries = state.log_repo.find_by_import(&job_id)?;
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
        }

        Commands::Config { action } => {
            let manager = state.config_manager();
            match action {
                ConfigAction::List => {
                    let snapshot = manager.get_config_snapshot()?;
                    for key in config_keys::ALL {
                        let value = snapshot.get(key).map(String::as_str).unwrap_or("(default)");
                        println!("{} = {}", key, value);
                    }
                }
                ConfigAction::Set { key, value } => {
                    if !config_keys::ALL.contains(&key.as_str()) {
                        bail!("未知配置项: {}", key);
                    }
                    manager.set_global_config_value(&key, &value)?;
                    println!("{} = {}", key, value);
                }
            }
        }

        Commands::AddStore {
            code,
            name,
            currency,
        } => {
            let store = state.catalog_repo.create_store(&code, &name, &currency).await?;
            println!("{}", store.id);
        }

        Commands::AddShippingCategory { name } => {
            let category = state.catalog_repo.create_shipping_category(&name).await?;
            println!("{}", category.id);
        }
    }

    Ok(())
}
