use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::Parser;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use translator::{FsLoader, RenderError, SourceLoader};

#[derive(Parser)]
#[command(
    name = "pug2html",
    version,
    about = "Pug to HTML translator",
    disable_help_flag = true
)]
struct Cli {
    /// Show this usage and exit
    #[arg(short = 'h', long = "help")]
    help: bool,

    /// Translate without writing the output file (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed line tree instead of translating
    #[arg(long)]
    tree: bool,

    /// Disable colored error output
    #[arg(long)]
    no_color: bool,

    /// Pug source files
    files: Vec<PathBuf>,
}

fn print_usage() {
    eprintln!("===[ pug2html ]===");
    eprintln!();
    eprintln!("[USAGE] $ pug2html (options) <file.pug>");
    eprintln!("[options]");
    eprintln!("  -h, --help : shows this usage only");
    eprintln!("  --check    : translates without writing the output file");
    eprintln!("  --tree     : dumps the parsed line tree");
    eprintln!("  --no-color : disables colored error output");
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.help {
        print_usage();
        process::exit(1);
    }
    if cli.files.is_empty() {
        print_usage();
        eprintln!("No pug file is specified.");
        process::exit(2);
    }
    if cli.files.len() > 1 {
        print_usage();
        eprintln!("Several pug files are specified.");
        process::exit(2);
    }
    let path = &cli.files[0];
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    // Read source
    let loader = FsLoader;
    let source = match loader.load(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{}", error);
            process::exit(2);
        }
    };

    // Set up codespan file database
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source.clone());

    // Parse
    let tree = match pug::parser::Parser::new(source, file_id).parse() {
        Ok(tree) => tree,
        Err(error) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            let diagnostic = error.to_diagnostic();
            let _ = term::emit(&mut writer.lock(), &config, &files, &diagnostic);
            process::exit(2);
        }
    };

    // --tree: dump the line tree
    if cli.tree {
        println!("{:#?}", tree);
        return;
    }

    // Render
    let html = match translator::render(Rc::new(tree), path, &loader) {
        Ok(html) => html,
        Err(error) => {
            eprintln!("{}", error);
            process::exit(2);
        }
    };

    // --check: translation succeeded, don't write
    if cli.check {
        eprintln!("ok: {} translated successfully", path.display());
        return;
    }

    let output = path.with_extension("html");
    log::info!("writing {}", output.display());
    if let Err(cause) = std::fs::write(&output, &html) {
        eprintln!("{}", RenderError::Io { path: output, cause });
        process::exit(2);
    }
}
