mod app;
mod cli;
mod completions;
mod config;
mod db;
mod loader;
mod logging;
mod store;
mod ui;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::{Commands, TaxonomySubcommands};

    let cli = cli::Cli::parse();
    logging::init(cli.verbose);

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let mut app = app::App::open(cli.db.as_deref(), cli.config.as_deref())?;

    match cli.command {
        Commands::ImportTerms(args) => {
            let taxonomy = args.taxonomy.clone();
            let quiet = args.json;
            let summary = app.import_terms(
                &args.taxonomy,
                args.file.as_deref(),
                args.delimiter.as_deref(),
                args.strict,
                args.dry_run,
                &mut |event| {
                    if !quiet {
                        ui::print_term_event(event, &taxonomy);
                    }
                },
            )?;
            if args.json {
                print_json(&summary);
            } else {
                ui::print_import_summary(&summary);
                ui::print_term_tree(&summary.taxonomy, &app.list_terms(&summary.taxonomy)?);
            }
        }
        Commands::Check(args) => {
            let report = app.check(
                &args.taxonomy,
                args.file.as_deref(),
                args.delimiter.as_deref(),
            )?;
            if args.json {
                print_json(&report);
            } else {
                ui::print_ambiguous_parents(&args.taxonomy, &report);
            }
            if !report.is_empty() {
                return Err(app::AppError::InvalidArgument(format!(
                    "check found {} ambiguous parent name(s)",
                    report.len()
                )));
            }
        }
        Commands::Taxonomy(args) => match args.command {
            TaxonomySubcommands::Add(add_args) => {
                let taxonomy = app.add_taxonomy(&add_args.name, !add_args.flat)?;
                println!(
                    "registered taxonomy {} ({})",
                    taxonomy.name,
                    if taxonomy.hierarchical {
                        "hierarchical"
                    } else {
                        "flat"
                    }
                );
            }
            TaxonomySubcommands::Ls(ls_args) => {
                let taxonomies = app.list_taxonomies()?;
                if ls_args.json {
                    print_json(&taxonomies);
                } else {
                    ui::print_taxonomies(&taxonomies);
                }
            }
        },
        Commands::Terms(args) => {
            let terms = app.list_terms(&args.taxonomy)?;
            if args.json {
                print_json(&terms);
            } else {
                ui::print_term_tree(&args.taxonomy, &terms);
            }
        }
        Commands::Runs(args) => {
            let runs = app.list_runs(args.limit)?;
            if args.json {
                print_json(&runs);
            } else {
                ui::print_runs(&runs);
            }
        }
        Commands::Completions(_) => {
            unreachable!("completions are handled before the store is opened")
        }
    }

    Ok(())
}
