use gauntlet_core::checker::token_checker;
use gauntlet_core::note;
use gauntlet_core::compile::{CompileCache, Preset, compile};
use gauntlet_core::config::GauntletConfig;
use gauntlet_core::program::Program;
use gauntlet_core::verify::{StressOutcome, profile, stress_test};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile `<stem>.cpp` into `<stem>.exe`, skipping unchanged sources.
    Compile {
        stem: String,
        #[clap(long)]
        fast: bool,
    },
    /// Compile, then run the result with inherited standard streams.
    Test {
        stem: String,
        #[clap(long)]
        fast: bool,
    },
    /// Time repeated runs of a program over generated inputs.
    Profile {
        program: PathBuf,
        /// Generator program; its stdout becomes each trial's input.
        #[clap(long)]
        generator: PathBuf,
        #[clap(short, long)]
        runs: Option<usize>,
        #[clap(long)]
        persist_input: bool,
    },
    /// Stress-test a candidate against a reference implementation.
    Stress {
        reference: PathBuf,
        candidate: PathBuf,
        /// Generator program; its stdout becomes each trial's input.
        #[clap(long)]
        generator: PathBuf,
        #[clap(short, long)]
        runs: Option<usize>,
        #[clap(long)]
        no_persist: bool,
    },
}

fn load_config(cli_path: Option<PathBuf>) -> Result<GauntletConfig, anyhow::Error> {
    match cli_path {
        Some(config_path) => GauntletConfig::load_from_file(&config_path),
        None => {
            let default_config_path = PathBuf::from("gauntlet.toml");
            if default_config_path.exists() {
                GauntletConfig::load_from_file(&default_config_path)
            } else {
                Ok(GauntletConfig::default())
            }
        }
    }
}

/// Wraps a generator executable as the input-generator collaborator: each
/// trial's input is the generator's captured stdout. A broken generator
/// aborts the campaign with a nonzero exit.
fn program_generator(path: PathBuf) -> impl FnMut() -> String {
    let mut next_input = gauntlet_core::generator::from_program(Program::new(path));
    move || match next_input() {
        Ok(input) => input,
        Err(error) => {
            note!("{error}, aborting campaign");
            std::process::exit(1);
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Ctrl-C must not kill the harness: the child in our process group dies
    // to the signal, the runner folds that into an absent result, and the
    // campaign stops cleanly.
    ctrlc::set_handler(|| {
        note!("interrupted");
    })?;

    let config = load_config(cli.config_file)?;

    let cache = match &config.compile.cache_path {
        Some(path) => CompileCache::new(path),
        None => CompileCache::in_home_dir(),
    };
    let preset_for = |fast: bool| if fast { Preset::Fast } else { config.compile.preset };

    match cli.command {
        Command::Compile { stem, fast } => {
            compile(&stem, preset_for(fast), &cache)?;
        }
        Command::Test { stem, fast } => {
            let program = compile(&stem, preset_for(fast), &cache)?;
            program.run()?;
        }
        Command::Profile {
            program,
            generator,
            runs,
            persist_input,
        } => {
            let program = Program::new(program);
            let run_count = runs.unwrap_or(config.profile.run_count);
            let persist = persist_input || config.profile.persist_input;
            let report = profile(&program, program_generator(generator), run_count, persist)?;
            if report.is_none() && run_count > 0 {
                std::process::exit(1);
            }
        }
        Command::Stress {
            reference,
            candidate,
            generator,
            runs,
            no_persist,
        } => {
            let reference = Program::new(reference);
            let candidate = Program::new(candidate);
            let run_count = runs.unwrap_or(config.stress.run_count);
            let persist = !no_persist && config.stress.persist_input;
            let outcome = stress_test(
                &reference,
                &candidate,
                program_generator(generator),
                token_checker,
                run_count,
                persist,
            )?;
            if !matches!(outcome, StressOutcome::Passed { .. }) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
