use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use readassist::config::discover_config;
use readassist::dictionary::CedictDictionary;
use readassist::pipeline::{
    init_default_config, ConfigOverrides, EnrichmentPipeline, PipelineConfig,
};
use readassist::server::{serve, AppState};

#[derive(Parser, Debug)]
#[command(name = "readassist")]
#[command(about = "Chinese reading assistant: segmentation, translation and in-context sense selection", long_about = None)]
struct Args {
    /// Generate default config + prompt files, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing config/prompt files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: $READASSIST_CONFIG, then search for readassist.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (e.g. 127.0.0.1:5000)
    #[arg(long)]
    bind: Option<String>,

    /// CC-CEDICT dictionary file
    #[arg(long, value_name = "FILE")]
    dictionary: Option<PathBuf>,

    /// OpenAI-compatible base URL for the sense model
    #[arg(long)]
    model_url: Option<String>,

    /// Model id for the sense model (and the llm translator)
    #[arg(long)]
    model: Option<String>,

    /// Translator provider: llm, libretranslate or disabled
    #[arg(long)]
    translator: Option<String>,

    /// Enrich one sentence, print the JSON result to stdout and exit
    #[arg(long, value_name = "SENTENCE")]
    parse: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(long)]
    quiet: bool,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn init_logging(args: &Args) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let (file_cfg, cfg_path) = discover_config(args.config.clone(), env_var)?;
    let overrides = ConfigOverrides {
        bind: args.bind.clone(),
        dictionary: args.dictionary.clone(),
        model_url: args.model_url.clone(),
        model: args.model.clone(),
        translator: args.translator.clone(),
    }
    .with_env(env_var);
    let cfg = PipelineConfig::from_app_config(&file_cfg, &cfg_path, &overrides)
        .context("build config")?;

    let dictionary = Arc::new(
        CedictDictionary::from_path(&cfg.dictionary_path).context("load dictionary")?,
    );
    let pipeline =
        EnrichmentPipeline::from_config(&cfg, dictionary.clone()).context("build pipeline")?;

    if let Some(sentence) = args.parse.as_deref() {
        let result = pipeline.run(sentence).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let state = Arc::new(AppState::new(pipeline, dictionary, &cfg.cors_origin)?);
    serve(&cfg.bind, state).await
}
