//! richtext - convert between HTML and editor documents

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;

use richtext_schema::{Error, ParseOptions, Result, WhitespaceMode, decode_text, editor};

#[derive(Parser)]
#[command(name = "richtext")]
#[command(version, about = "Convert between HTML and editor documents", long_about = None)]
#[command(after_help = "EXAMPLES:
    richtext parse page.html --pretty     HTML to document JSON
    richtext render doc.json -o out.html  Document JSON to HTML
    richtext check doc.json               Validate a document
    richtext schema                       List node and mark types")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Parse HTML into document JSON
    Parse {
        /// Input HTML file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        /// Whitespace handling for text
        #[arg(long, value_enum, default_value = "collapse")]
        preserve_whitespace: WhitespaceMode,
    },
    /// Render document JSON as HTML
    Render {
        /// Input JSON file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Check document JSON against the schema
    Check {
        /// Input JSON file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// List the schema's node and mark types
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let result = match cli.command {
        Command::Parse {
            input,
            output,
            pretty,
            preserve_whitespace,
        } => parse(&input, output.as_deref(), pretty, preserve_whitespace),
        Command::Render { input, output } => render(&input, output.as_deref()),
        Command::Check { input } => check(&input, cli.quiet),
        Command::Schema => {
            print_schema();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("RICHTEXT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Only fails if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes)?;
        Ok(bytes)
    } else {
        Ok(fs::read(path)?)
    }
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text)?;
            debug!(path = %path.display(), bytes = text.len(), "wrote output");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<richtext_schema::Node> {
    let bytes = read_input(path)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    editor::schema().node_from_json(&value)
}

fn parse(
    input: &Path,
    output: Option<&Path>,
    pretty: bool,
    preserve_whitespace: WhitespaceMode,
) -> Result<()> {
    let bytes = read_input(input)?;
    let html = decode_text(&bytes);
    let options = ParseOptions {
        preserve_whitespace,
        ..ParseOptions::default()
    };
    let doc = editor::parser().parse(&html, &options)?;
    let json = doc.to_json(editor::schema())?;
    let text = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    write_output(output, &text)
}

fn render(input: &Path, output: Option<&Path>) -> Result<()> {
    let node = read_document(input)?;
    let schema = editor::schema();
    let html = if node.type_id() == schema.top_node_type().id() {
        editor::serializer().to_html(node.content())?
    } else {
        let dom = editor::serializer().serialize_node(&node)?;
        richtext_schema::dom::inner_html(&dom, dom.document())
    };
    write_output(output, &html)
}

fn check(input: &Path, quiet: bool) -> Result<()> {
    let node = read_document(input)?;
    let schema = editor::schema();
    if node.type_id() != schema.top_node_type().id() {
        return Err(Error::MalformedJson(format!(
            "expected a {} node at the top",
            schema.top_node_type().name()
        )));
    }
    node.check(schema)?;
    if !quiet {
        println!("ok: {} blocks", node.child_count());
    }
    Ok(())
}

fn print_schema() {
    let schema = editor::schema();
    println!("Nodes:");
    for node_type in schema.node_types() {
        let mut line = format!("  {:<16}", node_type.name());
        if !node_type.content_expr().is_empty() {
            line.push_str(&format!(" content={}", node_type.content_expr()));
        }
        if !node_type.groups().is_empty() {
            line.push_str(&format!(" group={}", node_type.groups().join(" ")));
        }
        if node_type.is_inline() {
            line.push_str(" inline");
        }
        if node_type.defining() {
            line.push_str(" defining");
        }
        println!("{}", line.trim_end());
    }
    println!("Marks:");
    for mark_type in schema.mark_types() {
        println!("  {}", mark_type.name());
    }
}
