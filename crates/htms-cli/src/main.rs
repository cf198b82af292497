use clap::{Args, Parser, Subcommand};
use htms_compiler::{render_diagnostic, CompileOptions, CompileResult, OutputFormat};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "htms")]
#[command(about = "HTMS compiler: declarative UI to TypeScript or a static HTML document")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an .htms file and write the generated files
    Build(BuildArgs),

    /// Check an .htms file for errors without generating output
    Check {
        /// Input .htms file
        path: PathBuf,

        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Input .htms file
    path: PathBuf,

    /// Directory the generated files are written to
    #[arg(short, long, default_value = "dist")]
    out_dir: PathBuf,

    /// Backend: `procedural` (TypeScript) or `static-document` (HTML)
    #[arg(short, long, default_value = "procedural")]
    format: OutputFormat,

    /// Emit one fragment per page, fetched on navigation (static-document)
    #[arg(long)]
    split: bool,

    /// HTML document to inject the output into after its <body> tag (static-document)
    #[arg(long)]
    template: Option<PathBuf>,

    /// File name of the generated document (static-document)
    #[arg(long)]
    document_name: Option<String>,

    /// Do not generate the router
    #[arg(long)]
    no_router: bool,

    /// Do not generate event wiring
    #[arg(long)]
    no_events: bool,
}

impl BuildArgs {
    fn options(&self, template_document: Option<String>) -> Result<CompileOptions, CliError> {
        let output_document_name = self
            .document_name
            .as_deref()
            .map(document_name)
            .transpose()?;
        Ok(CompileOptions {
            output_format: self.format,
            generate_router: !self.no_router,
            generate_events: !self.no_events,
            template_document,
            output_document_name,
            split_templates: self.split,
        })
    }
}

/// The document is written into the output directory, so its name must be a
/// single plain file name.
fn document_name(name: &str) -> Result<String, CliError> {
    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if plain && !name.contains(['/', '\\']) {
        Ok(name.to_string())
    } else {
        Err(CliError::DocumentName(name.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid document name '{0}': expected a file name without directories")]
    DocumentName(String),

    #[error("{0} error(s) found")]
    Failed(usize),

    #[error("cannot serialize the result: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Build(args) => cmd_build(&args),
        Command::Check { path, json } => cmd_check(&path, json),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_source(path: &Path) -> Result<String, CliError> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Print every diagnostic with its source context to stderr.
fn report(result: &CompileResult, source: &str, path: &Path) {
    let file_name = path.display().to_string();
    for diagnostic in &result.diagnostics {
        eprintln!("{}", render_diagnostic(diagnostic, source, &file_name));
    }
}

fn cmd_build(args: &BuildArgs) -> Result<(), CliError> {
    let source = read_source(&args.path)?;
    let template = args.template.as_deref().map(read_source).transpose()?;
    let options = args.options(template)?;

    let result = htms_compiler::compile(&source, &options);
    report(&result, &source, &args.path);
    if !result.success {
        return Err(CliError::Failed(result.errors().count()));
    }

    write_files(&result, &args.out_dir)?;
    eprintln!(
        "Built {} file(s) into {}",
        result.files.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn write_files(result: &CompileResult, out_dir: &Path) -> Result<(), CliError> {
    for file in &result.files {
        let target = out_dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| CliError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, &file.content).map_err(|source| CliError::Write {
            path: target.clone(),
            source,
        })?;
        tracing::debug!(path = %target.display(), bytes = file.content.len(), "wrote file");
    }
    Ok(())
}

fn cmd_check(path: &Path, json: bool) -> Result<(), CliError> {
    let source = read_source(path)?;
    let result = htms_compiler::check(&source);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report(&result, &source, path);
    }

    if !result.success {
        return Err(CliError::Failed(result.errors().count()));
    }
    if !json {
        eprintln!("OK: {}", path.display());
    }
    Ok(())
}
