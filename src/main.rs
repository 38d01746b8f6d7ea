use byte_unit::{Byte, UnitType};
use clap::{CommandFactory, Parser};
use colored::*;
use env_logger::{Builder, Env, Target};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use parking_lot::Mutex;
use rfscope::cli::{Cli, Commands, OutputFormat};
use rfscope::config::{parse_size_limit, Config};
use rfscope::error::{Result as RfscopeResult, RfscopeError};
use rfscope::grammar::{GrammarAsset, Highlighter, LanguageDefinition};
use rfscope::search::registry::{PROCESS_STRATEGY, SCAN_STRATEGY};
use rfscope::search::SearchResultSet;
use rfscope::view::{MemoryDocument, RenderOutcome};
use rfscope::{tui, RfscopeApp};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> RfscopeResult<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let start_time = Instant::now();
    info!("Application started with command: {:?}", cli.command);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Search {
            ref pattern,
            ref paths,
            max_results,
            max_columns,
            ref max_filesize,
            ref exclude,
            ref include,
            hidden,
            scan_only,
            format,
        } => {
            let primary = if scan_only { SCAN_STRATEGY } else { PROCESS_STRATEGY };
            let app = RfscopeApp::with_primary(config, primary)?;

            let mut query = app.query(pattern.clone(), paths.clone());
            if let Some(max_results) = max_results {
                query.max_results = max_results;
            }
            if let Some(max_columns) = max_columns {
                query.max_columns = max_columns;
            }
            if let Some(limit) = max_filesize {
                if parse_size_limit(limit).is_none() {
                    return Err(RfscopeError::InvalidArguments(format!(
                        "invalid --max-filesize '{limit}'"
                    )));
                }
                query.max_file_size = limit.clone();
            }
            query.exclude_globs.extend(exclude.iter().cloned());
            query.include_globs.extend(include.iter().cloned());
            query.include_hidden |= hidden;

            let pb = spinner();
            pb.set_message(format!("Searching for '{pattern}'..."));
            let results = app.search(&query).await;
            pb.finish_and_clear();

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
                OutputFormat::Text => print_results(&results),
            }
            print_metrics(&cli, &app);
        }

        Commands::Preview {
            ref file,
            line,
            height,
        } => {
            let app = RfscopeApp::new(config)?;
            print_file_summary(file);

            let surface = Arc::new(Mutex::new(MemoryDocument::new(
                height,
                app.config().preview.line_height,
            )));
            let renderer = app.renderer(Arc::clone(&surface));
            let focus = line.map(|l| l.saturating_sub(1));
            match app.preview(&renderer, file, focus).await {
                RenderOutcome::Rendered { .. } => {
                    let theme = app
                        .loader()
                        .load_theme_if_needed(&renderer.options().theme)
                        .await?;
                    print_visible(&surface.lock(), &theme);
                }
                RenderOutcome::Failed(details) => {
                    eprintln!("{}", rfscope::view::PREVIEW_UNAVAILABLE.red().bold());
                    eprintln!("{}", details.red());
                }
                RenderOutcome::Cancelled => {}
            }
            print_metrics(&cli, &app);
        }

        Commands::Interactive {
            ref pattern,
            ref paths,
        } => {
            let app = RfscopeApp::new(config)?;
            let query = app.query(pattern.clone(), paths.clone());

            let pb = spinner();
            pb.set_message(format!("Searching for '{pattern}'..."));
            let results = app.search(&query).await;
            pb.finish_and_clear();

            tui::run(&app, results).await?;
            print_metrics(&cli, &app);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rfscope", &mut std::io::stdout());
        }
    }

    info!(
        "Application finished. Total elapsed time: {:.2?}",
        start_time.elapsed()
    );
    Ok(())
}

fn setup_logging(cli: &Cli) -> RfscopeResult<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir)?;
            }
        }
        let log_file = fs::File::create(log_path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| RfscopeError::Other(e.to_string()))?;
    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn print_results(results: &SearchResultSet) {
    if let Some(message) = &results.message {
        println!("{}", message.yellow());
        return;
    }

    println!(
        "{} {} {} {}",
        "Found".green(),
        results.len(),
        "matches".green(),
        format!("({})", results.strategy.as_deref().unwrap_or("-")).dimmed()
    );
    for found in &results.matches {
        println!(
            "{}:{}:{}: {}",
            found.file.display().to_string().cyan(),
            found.line.to_string().yellow(),
            found.column,
            found.preview
        );
    }
}

fn print_file_summary(file: &Path) {
    if let Ok(metadata) = fs::metadata(file) {
        let adjusted = Byte::from_u64(metadata.len()).get_appropriate_unit(UnitType::Binary);
        println!(
            "{} {}",
            file.display().to_string().cyan().bold(),
            format!("({:.2} {})", adjusted.get_value(), adjusted.get_unit()).dimmed()
        );
    }
}

fn print_visible(surface: &MemoryDocument, theme: &GrammarAsset) {
    let plaintext = LanguageDefinition::plaintext();
    let Some(theme) = theme.as_theme() else {
        return;
    };
    let highlighter = Highlighter::new(&plaintext, theme);
    for line in surface.visible_lines() {
        println!("{}", highlighter.to_ansi(line));
    }
}

fn print_metrics(cli: &Cli, app: &RfscopeApp) {
    if cli.metrics {
        println!("\n{}", "Metrics:".green().bold());
        print!("{}", app.metrics().gather());
    }
}
