use log::{error, info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use rust_manga_sources::config::Config;
use rust_manga_sources::error::{Result, SourceError};
use rust_manga_sources::models::{PageCursor, SearchQuery};
use rust_manga_sources::sources::{self, Source};
use rust_manga_sources::pages;
use rust_manga_sources::vrf::{self, VrfEncoding};
use serde::Serialize;
use std::env;
use std::fs;
use std::process::ExitCode;

const USAGE: &str = "usage:
  rust_manga_sources vrf <text> [--base64]
  rust_manga_sources pages <file>
  rust_manga_sources search <source> <query> [page]
  rust_manga_sources details <source> <manga-id>
  rust_manga_sources chapters <source> <manga-id>
  rust_manga_sources read <source> <manga-id> <chapter-id>
  rust_manga_sources sections <source>
  rust_manga_sources section <source> <section-id> [page]";

fn init_logging() {
    if log4rs::init_file("log4rs.yml", Default::default()).is_ok() {
        return;
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}")))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    if let Ok(config) = config {
        let _ = log4rs::init_config(config);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SourceError::Parse(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| SourceError::Parse(format!("missing <{}>\n{}", name, USAGE)))
}

fn cursor_arg(args: &[String], index: usize) -> Option<PageCursor> {
    args.get(index).and_then(|p| p.parse().ok()).map(PageCursor::page)
}

async fn run(args: &[String]) -> Result<()> {
    let command = arg(args, 0, "command")?;

    match command {
        "vrf" => {
            let text = arg(args, 1, "text")?;
            let encoding = if args.iter().any(|a| a == "--base64") {
                VrfEncoding::Base64
            } else {
                VrfEncoding::Url
            };
            println!("{}", vrf::compute_signature(text, encoding));
            return Ok(());
        }
        "pages" => {
            let path = arg(args, 1, "file")?;
            let raw = fs::read_to_string(path)
                .map_err(|e| SourceError::Parse(format!("cannot read {}: {}", path, e)))?;
            return print_json(&pages::reconstruct_pages(&raw)?);
        }
        _ => {}
    }

    let source: Source = arg(args, 1, "source")?.parse()?;
    let config = Config::load();
    let client = config.http.create_client()?;

    match command {
        "search" => {
            let query = SearchQuery::titled(arg(args, 2, "query")?);
            let cursor = cursor_arg(args, 3);
            let results = sources::search(&client, &config, source, &query, cursor.as_ref()).await?;
            print_json(&results)
        }
        "details" => {
            let manga = sources::get_manga_details(&client, source, arg(args, 2, "manga-id")?).await?;
            print_json(&manga)
        }
        "chapters" => {
            let manga_id = arg(args, 2, "manga-id")?;
            let manga = sources::get_manga_details(&client, source, manga_id).await?;
            let chapters = sources::get_chapters(&client, &config, source, &manga).await?;
            info!("{}: {} chapters for {}", source, chapters.len(), manga_id);
            print_json(&chapters)
        }
        "read" => {
            let manga = sources::get_manga_details(&client, source, arg(args, 2, "manga-id")?).await?;
            let chapter_id = arg(args, 3, "chapter-id")?;
            let chapters = sources::get_chapters(&client, &config, source, &manga).await?;
            let chapter = chapters
                .into_iter()
                .find(|c| c.chapter_id == chapter_id)
                .ok_or_else(|| SourceError::Parse(format!("chapter {} not found", chapter_id)))?;
            let details = sources::get_chapter_details(&client, &config, source, &manga, &chapter).await?;
            print_json(&details)
        }
        "sections" => print_json(&sources::discover_sections(&client, source).await?),
        "section" => {
            let section_id = arg(args, 2, "section-id")?;
            let cursor = cursor_arg(args, 3);
            let items =
                sources::discover_section_items(&client, &config, source, section_id, cursor.as_ref()).await?;
            print_json(&items)
        }
        other => Err(SourceError::Parse(format!("unknown command `{}`\n{}", other, USAGE))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    if let Err(e) = vrf::init() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
