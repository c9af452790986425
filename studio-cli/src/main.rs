//! # Layer Studio CLI
//!
//! Headless entry point for the Layer Studio editor.

use clap::Parser;
use studio_cli::{export_document, generate_image, remove_background, CliArgs, Command};
use studio_core::Editor;
use studio_genai::{GeminiImageService, ServiceConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("studio_cli=debug,studio_core=info,studio_genai=debug")
    });

    // stdout carries command output only
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn service(args: &CliArgs) -> anyhow::Result<GeminiImageService> {
    let config = ServiceConfig::try_from(&args.service)?;
    tracing::debug!("Using model {} at {}", config.model, config.base_url);
    Ok(GeminiImageService::new(&config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let viewport = args.viewport();
    tracing::debug!("Viewport {}x{}", viewport.width, viewport.height);

    match &args.command {
        Command::Export(export) => {
            let written = export_document(export, viewport)?;
            println!("{} ({written} bytes)", export.output.display());
        }
        Command::Generate(generate) => {
            let service = service(&args)?;
            let mut editor = Editor::new(viewport);
            generate_image(&mut editor, &service, generate).await?;
            println!("{}", generate.output.display());
        }
        Command::RemoveBg(remove) => {
            let service = service(&args)?;
            let mut editor = Editor::new(viewport);
            remove_background(&mut editor, &service, remove).await?;
            println!("{}", remove.output.display());
        }
    }

    Ok(())
}
