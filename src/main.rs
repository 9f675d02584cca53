use std::fs::File;

use clap::Parser;
use simplelog::{ColorChoice, CombinedLogger, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use importer::{Config, ImportError};

mod importer;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // a missing .env is fine
    dotenv::dotenv().ok();
    let config = Config::parse();

    if let Err(e) = run(&config).await {
        eprintln!("[FATAL] {}", e);
        std::process::exit(1);
    }
}

async fn run(config: &Config) -> Result<(), ImportError> {
    init_logger(config)?;

    if config.check {
        let tables = importer::check_connection(config).await?;
        println!("Database connection successful!");
        println!("Tables found: {:?}", tables);
        return Ok(());
    }

    if let Some(key) = &config.show {
        let found = importer::lookup(config, key).await?;
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    let report = importer::run(config).await?;
    if config.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
        println!("\n[DONE] Import complete.");
    }
    Ok(())
}

/// log to stderr, and to a file when one is configured
fn init_logger(config: &Config) -> Result<(), ImportError> {
    let log_config = simplelog::ConfigBuilder::new()
        .set_target_level(simplelog::LevelFilter::Off)
        .add_filter_ignore_str("sqlx")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        config.log_level,
        log_config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));
    if let Some(path) = &config.log_file {
        loggers.push(WriteLogger::new(
            config.log_level,
            log_config,
            File::create(path)?,
        ));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}
