use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "migrant")]
#[command(bin_name = "migrant")]
#[command(version)]
#[command(about = "Bulk-import hierarchical taxonomy terms from spreadsheets")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "MIGRANT_DB_PATH",
        help = "Path to the SQLite term store (default .migrant/site.sqlite)."
    )]
    pub db: Option<String>,

    #[arg(
        short = 'c',
        long,
        env = "MIGRANT_CONFIG",
        help = "Path to a migrant.toml config file."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase diagnostic logging (-v debug, -vv trace)."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(
        name = "import-terms",
        about = "Import terms from a CSV file, left-to-right as parent to child.",
        long_about = IMPORT_TERMS_LONG_ABOUT
    )]
    ImportTerms(ImportTermsArgs),
    #[command(about = "Report parent names that would resolve ambiguously.")]
    Check(CheckArgs),
    #[command(about = "Register and list taxonomies.")]
    Taxonomy(TaxonomyArgs),
    #[command(about = "Show the term tree of a taxonomy.")]
    Terms(TermsArgs),
    #[command(about = "List recorded import runs.")]
    Runs(RunsArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

const IMPORT_TERMS_LONG_ABOUT: &str = "\
Import terms from a CSV file.

The first row is a header and is skipped; its values are ignored. Each
following row is read left to right: a cell's parent is the nearest non-empty
cell to its left, so put the highest level of the hierarchy in the first
column. Rows may have any number of columns, and a one-column file imports a
flat list. Terms that already exist under the same parent are skipped, so the
same file can be imported repeatedly.

Parents are looked up by name. If the same name appears under more than one
parent, run `migrant check` first or pass --strict.";

#[derive(Debug, Args)]
pub struct ImportTermsArgs {
    #[arg(help = "Taxonomy to import the terms into.")]
    pub taxonomy: String,

    #[arg(short = 'f', long, help = "Path to the CSV file to import.")]
    pub file: Option<String>,

    #[arg(
        long,
        help = "Field delimiter, a single ASCII character or 'tab' (default ',')."
    )]
    pub delimiter: Option<String>,

    #[arg(long, help = "Refuse to import when any parent name is ambiguous.")]
    pub strict: bool,

    #[arg(short = 'n', long = "dry-run", help = "Report what would be created.")]
    pub dry_run: bool,

    #[arg(long, help = "Print the run summary as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(help = "Taxonomy the file would be imported into.")]
    pub taxonomy: String,

    #[arg(short = 'f', long, help = "Path to the CSV file to check.")]
    pub file: Option<String>,

    #[arg(long, help = "Field delimiter (default ',').")]
    pub delimiter: Option<String>,

    #[arg(long, help = "Print the report as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TaxonomyArgs {
    #[command(subcommand)]
    pub command: TaxonomySubcommands,
}

#[derive(Debug, Subcommand)]
pub enum TaxonomySubcommands {
    #[command(about = "Register a taxonomy, or update the hierarchical flag of an existing one.")]
    Add(TaxonomyAddArgs),
    #[command(about = "List registered taxonomies.")]
    Ls(JsonArgs),
}

#[derive(Debug, Args)]
pub struct TaxonomyAddArgs {
    #[arg(help = "Taxonomy name, for example location or category.")]
    pub name: String,

    #[arg(long, help = "Register a flat taxonomy whose terms cannot have parents.")]
    pub flat: bool,
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(long, help = "Print JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TermsArgs {
    #[arg(help = "Taxonomy to list.")]
    pub taxonomy: String,

    #[arg(long, help = "Print JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RunsArgs {
    #[arg(short = 'l', long, default_value_t = 20, help = "Maximum runs to show.")]
    pub limit: usize,

    #[arg(long, help = "Print JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands, TaxonomySubcommands};

    #[test]
    fn parses_import_terms_flags() {
        let cli = Cli::try_parse_from([
            "migrant",
            "-v",
            "import-terms",
            "location",
            "--file",
            "locations.csv",
            "--delimiter",
            ";",
            "--strict",
            "--dry-run",
        ])
        .expect("import-terms should parse");
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::ImportTerms(args) => {
                assert_eq!(args.taxonomy, "location");
                assert_eq!(args.file.as_deref(), Some("locations.csv"));
                assert_eq!(args.delimiter.as_deref(), Some(";"));
                assert!(args.strict);
                assert!(args.dry_run);
                assert!(!args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_taxonomy_add_flat() {
        let cli = Cli::try_parse_from(["migrant", "taxonomy", "add", "post_tag", "--flat"])
            .expect("taxonomy add should parse");
        match cli.command {
            Commands::Taxonomy(args) => match args.command {
                TaxonomySubcommands::Add(add) => {
                    assert_eq!(add.name, "post_tag");
                    assert!(add.flat);
                }
                other => panic!("unexpected subcommand: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn import_terms_requires_taxonomy() {
        assert!(Cli::try_parse_from(["migrant", "import-terms"]).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        super::styled_command().debug_assert();
    }
}
