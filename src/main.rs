//! 命令行入口

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vocab_highlighter::background::BackgroundService;
use vocab_highlighter::config::{ConfigManager, HighlighterConfig};
use vocab_highlighter::env::{self, EnvVar};
use vocab_highlighter::error::{HighlightError, HighlightResult};
use vocab_highlighter::messaging::TranslateResponse;
use vocab_highlighter::translation::BaiduTranslator;
use vocab_highlighter::vocab::{
    export_file_name, AddOutcome, JsonFileStore, PushHub, VocabularyService,
};
use vocab_highlighter::{highlight_html, strip_html};

#[derive(Parser)]
#[command(name = "vocab-highlighter")]
#[command(author, version)]
#[command(about = "Highlight your personal English vocabulary in HTML pages")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Vocabulary store file (overrides the configuration)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Input encoding of HTML pages
    #[arg(long, global = true, default_value = "utf-8")]
    encoding: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Highlight vocabulary words in an HTML page ("-" reads stdin)
    Highlight {
        page: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove highlight markup from an HTML page
    Strip {
        page: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Translate text; single words are added to the vocabulary
    Translate { text: String },
    /// Add or update a word
    Add { word: String, translation: String },
    /// Remove a word
    Remove { word: String },
    /// List the vocabulary
    List,
    /// Replace the vocabulary with a JSON file
    Import { file: PathBuf },
    /// Export the vocabulary as JSON
    Export {
        /// Output file; defaults to my_vocabulary_book_YYYY-MM-DD.json
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write an example configuration file
    Init { path: PathBuf },
    /// Show supported environment variables
    Env,
}

fn init_tracing() {
    let level = env::core::LogLevel::get_or_default("info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> HighlightResult<HighlighterConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.into_config();
    if let Some(store) = &cli.store {
        config.store_path = store.to_string_lossy().into_owned();
    }
    Ok(config)
}

fn read_input(page: &str) -> HighlightResult<Vec<u8>> {
    if page == "-" {
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read(page)?)
    }
}

fn write_output(output: Option<&Path>, data: &[u8]) -> HighlightResult<()> {
    match output {
        Some(path) => std::fs::write(path, data)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn vocabulary_service(config: &HighlighterConfig) -> VocabularyService {
    let store = JsonFileStore::new(config.store_path());
    VocabularyService::new(Arc::new(store), PushHub::new())
}

async fn run(cli: Cli) -> HighlightResult<()> {
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Init { path } => {
                ConfigManager::generate_example_config(path)?;
                println!("已生成示例配置: {}", path.display());
            }
            ConfigAction::Env => print!("{}", env::generate_env_docs()),
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    let service = vocabulary_service(&config);

    match &cli.command {
        Commands::Highlight { page, output } => {
            let html = read_input(page)?;
            let vocabulary = service.get_vocabulary().await;
            let (result, report) = highlight_html(&html, &cli.encoding, &vocabulary)?;
            tracing::info!(
                "高亮 {} 处 (扫描 {} 个文本节点)",
                report.spans_created,
                report.text_nodes_scanned
            );
            write_output(output.as_deref(), &result)?;
        }
        Commands::Strip { page, output } => {
            let html = read_input(page)?;
            let (result, restored) = strip_html(&html, &cli.encoding)?;
            tracing::info!("移除 {} 处高亮", restored);
            write_output(output.as_deref(), &result)?;
        }
        Commands::Translate { text } => {
            let translator = BaiduTranslator::from_config(&config)?;
            let background = BackgroundService::new(Arc::new(service), Arc::new(translator));
            match background.translate(text).await {
                TranslateResponse::Success {
                    translation,
                    phonetic,
                } => {
                    println!("{}", translation);
                    if let Some(phonetic) = phonetic {
                        println!("{}", phonetic);
                    }
                }
                TranslateResponse::Failure { error, message } => {
                    return Err(HighlightError::Service {
                        code: error.as_str().to_string(),
                        message,
                    });
                }
            }
        }
        Commands::Add { word, translation } => {
            let outcome = service.add_word(word, translation).await?;
            let label = match outcome {
                AddOutcome::Added => "已添加",
                AddOutcome::Updated => "已更新",
                AddOutcome::Unchanged => "未变化",
            };
            println!("{}: {}", label, word.trim().to_lowercase());
        }
        Commands::Remove { word } => {
            if service.remove_word(word).await? {
                println!("已移除: {}", word.trim().to_lowercase());
            } else {
                return Err(HighlightError::InvalidInput(format!(
                    "单词 \"{}\" 不在生词本中",
                    word
                )));
            }
        }
        Commands::List => {
            let vocabulary = service.get_vocabulary().await;
            for (word, translation) in vocabulary.iter() {
                println!("{}\t{}", word, translation);
            }
        }
        Commands::Import { file } => {
            let content = std::fs::read_to_string(file)?;
            let data: serde_json::Value = serde_json::from_str(&content)?;
            let count = service.import(&data).await?;
            println!("单词本已成功导入 ({}个单词)。", count);
        }
        Commands::Export { output, stdout } => {
            let json = service.export().await?;
            if *stdout {
                println!("{}", json);
            } else {
                let path = output.clone().unwrap_or_else(|| {
                    PathBuf::from(export_file_name(chrono::Local::now().date_naive()))
                });
                std::fs::write(&path, json)?;
                println!("已导出到 {}", path.display());
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("错误: 无法启动运行时: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("错误: {}", e);
            ExitCode::FAILURE
        }
    }
}
