// ==========================================
// 实体导入系统 - 命令行入口
// ==========================================
// 用法:
//   entity-import <config.json | @config_id> <source | --source-table=TABLE>
//                 [--db=PATH] [--dry-run] [--locale=en] [--save-as=config_id]
//                 [--delimiter=;] [--no-header] [--data-path=data.items]
//
// - source:       文件路径或 http(s) 地址，按扩展名识别 CSV / JSON
// - @config_id:   从数据库 entity_import_config 表读取已保存的配置
// 运行汇总以 JSON 输出到 stdout；中止时退出码非 0
// ==========================================

use anyhow::{bail, Context, Result};
use clap::Parser;
use entity_import::config::{ConfigManager, ImportConfigReader};
use entity_import::db::{default_db_path, ensure_parent_dir};
use entity_import::importer::{
    is_http_location, source_from_location, CsvSource, ImportRunner, JsonSource, Source,
    TableSource,
};
use entity_import::repository::SqliteEntityStore;
use entity_import::{i18n, logging, ImportConfig};

#[derive(Debug, Clone, PartialEq)]
enum ConfigArg {
    File(String),
    Stored(String),
}

impl ConfigArg {
    fn parse(value: &str) -> Self {
        match value.strip_prefix('@') {
            Some(id) => ConfigArg::Stored(id.to_string()),
            None => ConfigArg::File(value.to_string()),
        }
    }
}

/// 实体导入 - 将 CSV/JSON 记录（文件、HTTP 地址或数据库表）导入目标表
#[derive(Debug, Parser)]
#[command(name = "entity-import", version, about)]
struct CliArgs {
    /// 配置文件路径，或 @config_id 读取数据库中已保存的配置
    config: String,

    /// 数据源: 文件路径 / http(s) 地址 / 配合 --source-table 时省略
    #[arg(required_unless_present = "source_table")]
    source: Option<String>,

    /// 数据库文件路径（默认 ENTITY_IMPORT_DB_PATH 或系统数据目录）
    #[arg(long)]
    db: Option<String>,

    /// 试运行: 只校验和查找，不写入
    #[arg(long)]
    dry_run: bool,

    /// 通知语言 (zh-CN / en)
    #[arg(long)]
    locale: Option<String>,

    /// 导入前把本次配置保存为指定 ID
    #[arg(long, value_name = "CONFIG_ID")]
    save_as: Option<String>,

    /// CSV 分隔符（单字节）
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    /// CSV 首行不是表头（按列位置取值）
    #[arg(long)]
    no_header: bool,

    /// JSON 记录数组路径，例如 data.items
    #[arg(long)]
    data_path: Option<String>,

    /// 从同库的表读取源记录
    #[arg(long, conflicts_with = "source")]
    source_table: Option<String>,
}

impl CliArgs {
    fn config_arg(&self) -> ConfigArg {
        ConfigArg::parse(&self.config)
    }
}

fn parse_delimiter(value: &str) -> std::result::Result<u8, String> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!("分隔符必须是单个字节: {}", value)),
    }
}

/// 按命令行选项构建文件 / HTTP 数据源
fn build_source(location: &str, args: &CliArgs) -> Result<Box<dyn Source>> {
    // 扩展名与文件存在性校验
    let detected = source_from_location(location)?;
    let is_json = detected.name().starts_with("json:");
    let is_http = is_http_location(location);

    let source: Box<dyn Source> = if is_json {
        match &args.data_path {
            Some(path) if is_http => Box::new(JsonSource::from_url(location).with_data_path(path)),
            Some(path) => Box::new(JsonSource::from_path(location).with_data_path(path)),
            None => detected,
        }
    } else if args.delimiter.is_some() || args.no_header {
        let csv = if is_http {
            CsvSource::from_url(location)
        } else {
            CsvSource::from_path(location)
        };
        let mut csv = csv.with_header_row(!args.no_header);
        if let Some(delimiter) = args.delimiter {
            csv = csv.with_delimiter(delimiter);
        }
        Box::new(csv)
    } else {
        detected
    };
    Ok(source)
}

fn main() -> Result<()> {
    logging::init();

    let args = CliArgs::parse();
    if let Some(locale) = &args.locale {
        i18n::set_locale(locale);
    }

    let db_path = args.db.clone().unwrap_or_else(default_db_path);
    tracing::info!(db_path = %db_path, version = entity_import::VERSION, "使用数据库");

    ensure_parent_dir(&db_path).with_context(|| format!("无法创建数据库目录: {}", db_path))?;
    let store = SqliteEntityStore::new(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    let manager = ConfigManager::from_connection(store.connection())?;

    let config = match args.config_arg() {
        ConfigArg::File(path) => ImportConfig::from_json_file(&path)
            .with_context(|| format!("无法读取配置文件: {}", path))?,
        ConfigArg::Stored(id) => manager.import_config(&id)?,
    };
    if let Some(id) = &args.save_as {
        manager.save_import_config(id, &config)?;
    }

    let source: Box<dyn Source> = match (&args.source_table, &args.source) {
        (Some(table), _) => Box::new(TableSource::new(
            SqliteEntityStore::from_connection(store.connection()),
            table.as_str(),
        )),
        (None, Some(location)) => build_source(location, &args)?,
        (None, None) => bail!("缺少数据源"),
    };

    let runner = ImportRunner::new(store);
    let result = runner.run(&config, source.as_ref(), args.dry_run);

    println!("{}", serde_json::to_string_pretty(result.summary())?);

    if let Some(error) = result.error() {
        bail!("导入中止: {}", error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(list: &[&str]) -> std::result::Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("entity-import").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_file_config() {
        let parsed = parse(&["cfg.json", "members.csv", "--dry-run", "--locale", "en"]).unwrap();
        assert_eq!(parsed.config_arg(), ConfigArg::File("cfg.json".to_string()));
        assert_eq!(parsed.source.as_deref(), Some("members.csv"));
        assert_eq!(parsed.db, None);
        assert!(parsed.dry_run);
        assert_eq!(parsed.locale.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_stored_config() {
        let parsed =
            parse(&["@members", "members.json", "--db", "data.db", "--save-as=copy"]).unwrap();
        assert_eq!(parsed.config_arg(), ConfigArg::Stored("members".to_string()));
        assert_eq!(parsed.db.as_deref(), Some("data.db"));
        assert_eq!(parsed.save_as.as_deref(), Some("copy"));
        assert!(!parsed.dry_run);
    }

    #[test]
    fn test_parse_source_options() {
        let parsed = parse(&[
            "cfg.json",
            "m.csv",
            "--delimiter=;",
            "--no-header",
            "--data-path=data.items",
        ])
        .unwrap();
        assert_eq!(parsed.delimiter, Some(b';'));
        assert!(parsed.no_header);
        assert_eq!(parsed.data_path.as_deref(), Some("data.items"));

        assert!(parse(&["cfg.json", "m.csv", "--delimiter=;;"]).is_err());
    }

    #[test]
    fn test_parse_source_table() {
        let parsed = parse(&["cfg.json", "--source-table", "tl_legacy"]).unwrap();
        assert_eq!(parsed.source, None);
        assert_eq!(parsed.source_table.as_deref(), Some("tl_legacy"));

        assert!(parse(&["cfg.json", "m.csv", "--source-table", "tl_legacy"]).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["cfg.json"]).is_err());
        assert!(parse(&["a", "b", "c"]).is_err());
        assert!(parse(&["a", "b", "--force"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
