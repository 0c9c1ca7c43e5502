use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use plugin_mirror::catalog::FsCatalog;
use plugin_mirror::config::{self, FileConfig, MirrorConfig};
use plugin_mirror::core::Version;
use plugin_mirror::mirror::build_mirror;
use plugin_mirror::report::CatalogReport;
use plugin_mirror::view::CappedCatalog;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plugin-mirror", version, about = "Build a version-capped mirror of a plugin repository")]
struct Cli {
    /// TOML 配置文件（默认 <config_dir>/plugin-mirror/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 按平台版本上限构建镜像目录
    Mirror(MirrorArgs),
    /// 输出双上限视图的内容（不落地文件）
    List(ListArgs),
}

#[derive(Args)]
struct RepositoryArgs {
    /// 本地仓库根目录
    #[arg(long)]
    repository: Option<PathBuf>,

    /// 插件载荷扩展名（可重复）
    #[arg(long = "plugin-ext")]
    plugin_extensions: Vec<String>,

    /// 平台发布扩展名
    #[arg(long = "platform-ext")]
    platform_extension: Option<String>,
}

#[derive(Args)]
struct MirrorArgs {
    /// 平台版本上限：只镜像与之兼容的插件版本
    #[arg(long, visible_alias = "platform-version")]
    cap: Option<Version>,

    /// 每个插件最多保留的版本数（默认 1）
    #[arg(long)]
    max_versions: Option<usize>,

    /// 镜像目录（必须不存在或为空）
    #[arg(long)]
    download: Option<PathBuf>,

    /// 并行线程数（默认自适应）
    #[arg(long)]
    threads: Option<usize>,

    #[command(flatten)]
    repo: RepositoryArgs,

    /// 以 JSON 输出汇总
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ListArgs {
    /// 插件兼容上限；省略时每个插件直接保留最新 2 个版本
    #[arg(long)]
    plugin_cap: Option<Version>,

    /// 平台版本下界（默认同 --plugin-cap）
    #[arg(long)]
    core_cap: Option<Version>,

    #[command(flatten)]
    repo: RepositoryArgs,

    #[arg(long)]
    json: bool,
}

impl RepositoryArgs {
    fn into_overrides(self) -> FileConfig {
        FileConfig {
            repository: self.repository,
            plugin_extensions: (!self.plugin_extensions.is_empty()).then_some(self.plugin_extensions),
            platform_extension: self.platform_extension,
            ..FileConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let file = config::load_file(cli.config.as_deref())?;

    match cli.command {
        Command::Mirror(args) => run_mirror(file, args),
        Command::List(args) => run_list(file, args),
    }
}

fn run_mirror(file: FileConfig, args: MirrorArgs) -> anyhow::Result<()> {
    let json = args.json;
    let overrides = FileConfig {
        version: args.cap,
        max_versions: args.max_versions,
        download: args.download,
        threads: args.threads,
        ..args.repo.into_overrides()
    };
    let cfg = MirrorConfig::try_from(file.merge(overrides))?;
    info!(
        "Mirroring {} (<= {}, max {} per plugin) into {}",
        cfg.repository.display(),
        cfg.version,
        cfg.max_versions,
        cfg.download.display()
    );

    let report = build_mirror(&cfg)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        print!("{}", report.summary);
    }
    Ok(())
}

fn run_list(file: FileConfig, args: ListArgs) -> anyhow::Result<()> {
    let json = args.json;
    let cfg = file.merge(args.repo.into_overrides());
    let core_cap = args
        .core_cap
        .or_else(|| args.plugin_cap.clone())
        .ok_or_else(|| anyhow::anyhow!("--core-cap is required when --plugin-cap is not given"))?;

    let catalog = FsCatalog::open(cfg.repository()?, cfg.catalog_options())?;
    let view = CappedCatalog::new(catalog, args.plugin_cap, core_cap);
    let report = CatalogReport::collect(&view)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
