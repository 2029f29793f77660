use clap::Parser;
use fitsutils::cli::{Cli, Commands};
use fitsutils::commands::{
    combine_catalogs, make_mef, print_fits_header, show_metadata, split_head_file,
};
use fitsutils::config::{Config, TRACE_HDU_LEVEL};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if cli.verbose {
        config = config.with_min_debug_level(TRACE_HDU_LEVEL);
    }
    init_logging(&config);

    match cli.command {
        Commands::PrintHeader {
            outfile,
            extension,
            fitsfile,
        } => {
            print_fits_header(&fitsfile, &extension, outfile.as_deref(), &config)?;
        }
        Commands::CombineCats {
            outcat,
            incats,
            list,
        } => {
            combine_catalogs(&outcat, incats.as_deref(), list.as_deref(), &config)?;
        }
        Commands::SplitScampHead { input, out, list } => {
            split_head_file(&input, out.as_deref(), list.as_deref(), &config)?;
        }
        Commands::MakeMef {
            outname,
            filenames,
            list,
            clobber,
            extnames,
        } => {
            make_mef(
                &outname,
                filenames.as_deref(),
                list.as_deref(),
                clobber,
                extnames.as_deref(),
                &config,
            )?;
        }
        Commands::Metadata {
            fitsfile,
            extension,
            fields,
            format,
        } => {
            show_metadata(
                &fitsfile,
                extension.as_deref(),
                fields.as_deref(),
                format,
                &config,
            )?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the debug level.
fn init_logging(config: &Config) {
    let default_level = if config.debug_level > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
