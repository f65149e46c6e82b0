use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};

use audit_kit::{
    class_names::cn,
    config::{Overrides, WorkspaceSettings},
    csv_export::{records_from_json, DirectorySink},
    utils::{create_dir_all, dir_exists, read_file, write_json, WORKSPACE_DIR},
    AuditConfig, AuditMemory, CsvEscaping, CsvExporter, JsonFileStore,
};

/// Audit Kit CLI
///
/// 审计工作流工具：class 合并、CSV 导出、审计记忆
#[derive(Parser)]
#[command(name = "audit-kit")]
#[command(author, version = env!("APP_VERSION"), about)]
struct Cli {
    /// 审计记忆文件（默认：工作区 .audit/memory.json）
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// CSV 导出目录
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化工作区 - 在当前目录创建 .audit
    Init {
        /// 强制覆盖已存在的配置
        #[arg(short, long)]
        force: bool,
    },

    /// 合并 class 名，后出现的冲突 class 覆盖先出现的
    Cn {
        /// class 片段
        fragments: Vec<String>,
    },

    /// 把 JSON 记录数组导出为 CSV
    Export {
        /// 输入文件（JSON 数组）
        input: PathBuf,

        /// 输出文件名（默认：输入文件名改为 .csv）
        #[arg(short, long)]
        output: Option<String>,

        /// 使用 RFC 4180 转义
        #[arg(long)]
        rfc4180: bool,
    },

    /// 已修复的差异
    #[command(subcommand)]
    Fixed(FixedCommands),

    /// 已创建的商品
    #[command(subcommand)]
    Created(CreatedCommands),

    /// 清除审计记忆
    Clear,

    /// 显示存储与导出位置
    Where,
}

#[derive(Subcommand)]
enum FixedCommands {
    /// 列出已修复的差异
    List,

    /// 标记差异为已修复
    Mark { sku: String, field: String },

    /// 检查差异是否已修复（未修复时退出码为 1）
    Check { sku: String, field: String },
}

#[derive(Subcommand)]
enum CreatedCommands {
    /// 列出已创建的商品
    List,

    /// 标记商品为已创建
    Mark { handle: String },

    /// 检查商品是否已创建（未创建时退出码为 1）
    Check { handle: String },
}

// ═══════════════════════════════════════════════════════════════════
// 日志
// ═══════════════════════════════════════════════════════════════════

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "audit_kit=debug" } else { "audit_kit=warn" };
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ═══════════════════════════════════════════════════════════════════
// 工作区
// ═══════════════════════════════════════════════════════════════════

fn init_workspace(force: bool) -> Result<()> {
    let cwd = env::current_dir()?;
    let audit_dir = cwd.join(WORKSPACE_DIR);
    let config_file = audit_dir.join("config.json");

    if dir_exists(&audit_dir) && config_file.exists() && !force {
        println!(
            "{} {}",
            "⚠️  Workspace already initialized:".yellow(),
            audit_dir.display()
        );
        println!("Use {} to overwrite the config", "--force".cyan());
        return Ok(());
    }

    create_dir_all(&audit_dir)?;
    write_json(&config_file, &WorkspaceSettings::default())?;

    println!("{}", "✅ Workspace initialized".green().bold());
    println!("   📁 {}", audit_dir.display().to_string().cyan());
    Ok(())
}

fn show_locations(config: &AuditConfig) {
    match &config.workspace_root {
        Some(root) => println!("Workspace: {}", root.display().to_string().green()),
        None => println!("Workspace: {}", "(none)".yellow()),
    }
    println!("Store:     {}", config.store_path.display());
    println!("Exports:   {}", config.export_dir.display());
    println!("CSV:       {:?}", config.csv_escaping);
}

// ═══════════════════════════════════════════════════════════════════
// CSV 导出
// ═══════════════════════════════════════════════════════════════════

fn export_csv(
    config: &AuditConfig,
    input: &Path,
    output: Option<String>,
    rfc4180: bool,
) -> Result<()> {
    let content = read_file(input)?;
    let records = records_from_json(&content)
        .with_context(|| format!("Invalid records in {}", input.display()))?;

    if records.is_empty() {
        println!("{}", "No records to export".yellow());
        return Ok(());
    }

    let filename = output.unwrap_or_else(|| {
        input
            .with_extension("csv")
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "export.csv".to_string())
    });

    let escaping = if rfc4180 {
        CsvEscaping::Rfc4180
    } else {
        config.csv_escaping
    };

    let mut sink = DirectorySink::new(&config.export_dir);
    let path = sink
        .path_for(&filename)
        .with_context(|| format!("Invalid output filename: {}", filename))?;

    CsvExporter::new(escaping).download(Some(records.as_slice()), &filename, &mut sink)?;

    println!(
        "{} {} rows → {}",
        "✅".green(),
        records.len(),
        path.display().to_string().cyan()
    );
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════
// 审计记忆
// ═══════════════════════════════════════════════════════════════════

fn print_set(title: &str, items: &BTreeSet<String>) {
    if items.is_empty() {
        println!("{}", format!("No {}", title).yellow());
        return;
    }

    println!("{} ({})", title.bold(), items.len());
    for item in items {
        println!("  {} {}", "✓".green(), item);
    }
}

fn print_check(found: bool, label: &str) {
    if found {
        println!("{} {}", "✓".green(), label);
    } else {
        println!("{} {}", "✗".red(), label);
        std::process::exit(1);
    }
}

fn run_fixed(audit: &mut AuditMemory<JsonFileStore>, cmd: FixedCommands) {
    match cmd {
        FixedCommands::List => print_set("fixed mismatches", &audit.fixed_mismatches()),
        FixedCommands::Mark { sku, field } => {
            audit.mark_mismatch_as_fixed(&sku, &field);
            println!("{} {}-{} marked as fixed", "✅".green(), sku, field);
        }
        FixedCommands::Check { sku, field } => {
            let fixed = audit.is_mismatch_fixed(&sku, &field);
            print_check(fixed, &format!("{}-{}", sku, field));
        }
    }
}

fn run_created(audit: &mut AuditMemory<JsonFileStore>, cmd: CreatedCommands) {
    match cmd {
        CreatedCommands::List => print_set("created products", &audit.created_product_handles()),
        CreatedCommands::Mark { handle } => {
            audit.mark_product_as_created(&handle);
            println!("{} {} marked as created", "✅".green(), handle);
        }
        CreatedCommands::Check { handle } => {
            let created = audit.is_product_created(&handle);
            print_check(created, &handle);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = Overrides {
        store: cli.store,
        export_dir: cli.out_dir,
    };

    match cli.command {
        Commands::Init { force } => init_workspace(force),
        Commands::Cn { fragments } => {
            let refs: Vec<&dyn audit_kit::ClassFragment> = fragments
                .iter()
                .map(|f| f as &dyn audit_kit::ClassFragment)
                .collect();
            println!("{}", cn(&refs));
            Ok(())
        }
        Commands::Export {
            input,
            output,
            rfc4180,
        } => {
            let config = AuditConfig::resolve(&overrides)?;
            export_csv(&config, &input, output, rfc4180)
        }
        Commands::Fixed(cmd) => {
            let config = AuditConfig::resolve(&overrides)?;
            let mut audit = AuditMemory::new(JsonFileStore::new(&config.store_path));
            run_fixed(&mut audit, cmd);
            Ok(())
        }
        Commands::Created(cmd) => {
            let config = AuditConfig::resolve(&overrides)?;
            let mut audit = AuditMemory::new(JsonFileStore::new(&config.store_path));
            run_created(&mut audit, cmd);
            Ok(())
        }
        Commands::Clear => {
            let config = AuditConfig::resolve(&overrides)?;
            let mut audit = AuditMemory::new(JsonFileStore::new(&config.store_path));
            audit.clear();
            println!("{}", "🗑️  Audit memory cleared".green());
            Ok(())
        }
        Commands::Where => {
            let config = AuditConfig::resolve(&overrides)?;
            show_locations(&config);
            Ok(())
        }
    }
}
