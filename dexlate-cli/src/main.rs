use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use dexlate::{
    LanguagePaths, LoadedLanguage, MissingTranslation, TranslateOptions, available_languages,
    missing::append_report, run_batch, translate_file, validate_language,
};
use dexlate_cli::{
    config::{ApplyOverrides, RunConfig},
    summary::{render_batch, render_batch_json, render_inspect, render_stats},
};
use log::warn;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a single document.
    Translate {
        /// The document to translate
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the translated document
        #[arg(short, long)]
        output: PathBuf,
        /// Target language code (e.g. it, fr, es)
        #[arg(short, long)]
        lang: String,
        /// Root directory holding one dictionary directory per language
        #[arg(long, default_value = "translations")]
        translations: PathBuf,
        /// Logical document path matched against `add_block` targets (defaults to the input path)
        #[arg(long)]
        path_key: Option<String>,
        /// Append untranslated records to this CSV
        #[arg(long)]
        missing_report: Option<PathBuf>,
    },

    /// Translate every document listed in the mod's info.xml.
    Apply {
        /// TOML run file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Target language code
        #[arg(short, long)]
        lang: Option<String>,
        /// Mod input directory (contains info.xml)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Root directory holding one dictionary directory per language
        #[arg(long)]
        translations: Option<PathBuf>,
        /// Output directory (defaults to output/<LANG>)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Version of the translated mod, used by the manifest version suffix
        #[arg(long)]
        version: Option<String>,
        /// Append untranslated records to this CSV
        #[arg(long)]
        missing_report: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List languages that have dictionaries.
    Languages {
        #[arg(long, default_value = "translations")]
        translations: PathBuf,
    },

    /// Show what is loaded for a language.
    Inspect {
        #[arg(short, long)]
        lang: String,
        #[arg(long, default_value = "translations")]
        translations: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_language(translations: &Path, lang: &str) -> Result<LoadedLanguage, String> {
    let lang = validate_language(lang).map_err(|e| e.to_string())?;
    let paths = LanguagePaths::conventional(translations, Path::new("output"), &lang);
    let loaded = LoadedLanguage::load(&paths.dictionaries, &paths.special_cases);
    for issue in loaded.reportable_issues() {
        warn!("{}", issue);
    }
    Ok(loaded)
}

fn run(args: Args) -> Result<(), String> {
    match args.commands {
        Commands::Translate {
            input,
            output,
            lang,
            translations,
            path_key,
            missing_report,
        } => {
            let loaded = load_language(&translations, &lang)?;
            let engine = loaded.engine(TranslateOptions::new().with_language(&lang));
            let path_key = path_key.unwrap_or_else(|| input.to_string_lossy().to_string());

            let translated =
                translate_file(&engine, &input, &output, &path_key).map_err(|e| e.to_string())?;
            for issue in &translated.issues {
                warn!("{}", issue);
            }
            print!(
                "{}",
                render_stats(&path_key, &translated.stats, translated.blocks_applied)
            );

            if let Some(csv) = missing_report {
                let rows = MissingTranslation::from_untranslated(&translated.stats.untranslated, &lang);
                let written = append_report(&csv, &rows).map_err(|e| e.to_string())?;
                println!("Missing translations exported: {}", written);
            }
            Ok(())
        }
        Commands::Apply {
            config,
            lang,
            input,
            translations,
            output,
            version,
            missing_report,
            json,
        } => {
            let file = match config {
                Some(path) => RunConfig::load(path)?,
                None => RunConfig::default(),
            };
            let options = file.into_batch_options(ApplyOverrides {
                language: lang,
                version,
                input_dir: input,
                translations_dir: translations,
                output_dir: output,
                missing_report,
            })?;

            let report = run_batch(&options).map_err(|e| e.to_string())?;
            if json {
                println!(
                    "{}",
                    render_batch_json(&report).map_err(|e| e.to_string())?
                );
            } else {
                print!("{}", render_batch(&report));
            }
            if report.failed() > 0 {
                return Err(format!("{} document(s) failed", report.failed()));
            }
            Ok(())
        }
        Commands::Languages { translations } => {
            let languages = available_languages(&translations).map_err(|e| e.to_string())?;
            if languages.is_empty() {
                println!("No languages found in {}", translations.display());
            }
            for lang in languages {
                println!("{}", lang);
            }
            Ok(())
        }
        Commands::Inspect {
            lang,
            translations,
            json,
        } => {
            let loaded = load_language(&translations, &lang)?;
            let issues: Vec<String> = loaded.reportable_issues().map(|e| e.to_string()).collect();
            let out = render_inspect(
                &lang,
                &loaded.dictionaries.summary(),
                &loaded.special_cases.summary(),
                &issues,
                json,
            )
            .map_err(|e| e.to_string())?;
            print!("{}", out);
            Ok(())
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
