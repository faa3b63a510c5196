use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use content_thumbnailer::{
    logging, AzureBlobStore, BlobStore, ContentItem, DiskBlobStore, MemoryBlobStore,
    ThumbnailError, ThumbnailGenerator, ThumbnailOutcome, ThumbnailerConfig,
};
use tracing::error;
use uuid::Uuid;

fn cli() -> Command {
    Command::new("content-thumbnailer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("コンテンツ画像のサムネイル（8/16/32/64/128px）を生成して Blob ストレージへアップロード")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("設定ファイル（TOML）"),
        )
        .arg(
            Arg::new("storage")
                .long("storage")
                .global(true)
                .help("ストレージ接続文字列（設定ファイル・環境変数より優先）"),
        )
        .arg(
            Arg::new("out-dir")
                .long("out-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Azure の代わりにローカルディレクトリへ書き出す"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("アップロードせずメモリ上で処理する"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("結果を JSON で出力"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("デバッグログを出力"),
        )
        .subcommand(
            Command::new("generate")
                .about("1件のコンテンツアイテムを処理")
                .arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .value_parser(value_parser!(Uuid))
                        .help("コンテンツアイテムID"),
                )
                .arg(
                    Arg::new("uri")
                        .long("uri")
                        .required(true)
                        .help("ソース画像の URL"),
                )
                .arg(
                    Arg::new("media-type")
                        .long("media-type")
                        .default_value("image")
                        .help("メディアタイプ"),
                ),
        )
        .subcommand(
            Command::new("batch")
                .about("JSON 配列のコンテンツアイテムを順に処理")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("ContentItem の JSON 配列ファイル"),
                ),
        )
}

fn build_generator(matches: &ArgMatches) -> Result<ThumbnailGenerator> {
    let config_path = matches.get_one::<PathBuf>("config");
    let config = ThumbnailerConfig::load_with_env(config_path.map(PathBuf::as_path))
        .context("設定の読み込みに失敗")?
        .with_storage_override(matches.get_one::<String>("storage").cloned());

    let store: Arc<dyn BlobStore> = if matches.get_flag("dry-run") {
        Arc::new(MemoryBlobStore::new())
    } else if let Some(dir) = matches.get_one::<PathBuf>("out-dir") {
        Arc::new(DiskBlobStore::new(dir))
    } else {
        let storage = config
            .storage
            .as_deref()
            .ok_or(ThumbnailError::StorageNotConfigured)
            .context("--storage、THUMBNAILS_STORAGE、--out-dir、--dry-run のいずれかを指定してください")?;
        Arc::new(
            AzureBlobStore::from_connection_string(storage, config.request_timeout())
                .context("ストレージ接続文字列が不正")?,
        )
    };

    Ok(ThumbnailGenerator::with_store(&config, store)?)
}

fn print_outcome(item: &ContentItem, outcome: &ThumbnailOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }
    match outcome {
        ThumbnailOutcome::Generated(report) => {
            println!(
                "{}: {}x{} -> {} 件",
                item.id,
                report.source_width,
                report.source_height,
                report.thumbnails.len()
            );
            for thumb in &report.thumbnails {
                println!("  {} ({} bytes)", thumb.blob_name, thumb.byte_len);
            }
        }
        ThumbnailOutcome::Skipped { reason, .. } => {
            println!("{}: スキップ ({:?})", item.id, reason);
        }
    }
    Ok(())
}

async fn run(matches: ArgMatches) -> Result<bool> {
    let json = matches.get_flag("json");
    let generator = build_generator(&matches)?;

    match matches.subcommand() {
        Some(("generate", args)) => {
            let id = *args.get_one::<Uuid>("id").context("--id がありません")?;
            let uri = args.get_one::<String>("uri").context("--uri がありません")?;
            let media_type = args
                .get_one::<String>("media-type")
                .map(String::as_str)
                .unwrap_or("image");

            let item = ContentItem::new(id, media_type, uri.as_str());
            let outcome = generator
                .create_thumbnails(&item)
                .await
                .with_context(|| format!("{} のサムネイル生成に失敗", item.id))?;
            print_outcome(&item, &outcome, json)?;
            Ok(true)
        }
        Some(("batch", args)) => {
            let path = args.get_one::<PathBuf>("path").context("入力ファイルがありません")?;
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("{} の読み込みに失敗", path.display()))?;
            let items: Vec<ContentItem> =
                serde_json::from_str(&text).context("ContentItem の JSON 配列として解析できません")?;

            // 失敗しても残りのアイテムは処理を続ける
            let mut failures = 0usize;
            for item in &items {
                match generator.create_thumbnails(item).await {
                    Ok(outcome) => print_outcome(item, &outcome, json)?,
                    Err(e) => {
                        failures += 1;
                        error!(content_item_id = %item.id, error = %e, "サムネイル生成に失敗");
                    }
                }
            }
            if failures > 0 {
                error!(failures, total = items.len(), "一部のアイテムが失敗");
            }
            Ok(failures == 0)
        }
        _ => Ok(false),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    logging::init(matches.get_flag("verbose"));

    match run(matches).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
