use clap::{Args, Parser, Subcommand};
use std::fs;
use std::process::ExitCode;
use wasmlens::features::{Feature, Features};
use wasmlens::tools::{dump, validate};

#[derive(Parser)]
#[command(name = "wasmlens")]
#[command(about = "WebAssembly module inspector and validator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a module's sections, details, code, and raw contents
    #[command(disable_help_flag = true)]
    Dump {
        /// Input wasm files
        #[arg(required = true)]
        files: Vec<String>,

        /// Print section headers
        #[arg(short = 'h', long)]
        headers: bool,

        /// Print disassembled code
        #[arg(short = 'd', long)]
        disassemble: bool,

        /// Print per-item section details
        #[arg(short = 'x', long)]
        details: bool,

        /// Print raw section contents
        #[arg(short = 's', long = "full-contents")]
        full_contents: bool,

        /// Restrict output to the named section
        #[arg(short = 'j', long = "section", value_name = "NAME")]
        section: Option<String>,
    },

    /// Check that modules decode and validate
    Validate {
        /// Input wasm files
        #[arg(required = true)]
        files: Vec<String>,

        /// Print a line for every file, not just failures
        #[arg(short = 'v', long)]
        verbose: bool,

        #[command(flatten)]
        features: FeatureFlags,
    },
}

/// One enable flag per proposal; all off matches the MVP.
#[derive(Args, Default)]
struct FeatureFlags {
    #[arg(long)]
    enable_mutable_globals: bool,
    #[arg(long)]
    enable_saturating_float_to_int: bool,
    #[arg(long)]
    enable_sign_extension: bool,
    #[arg(long)]
    enable_simd: bool,
    #[arg(long)]
    enable_threads: bool,
    #[arg(long)]
    enable_multi_value: bool,
    #[arg(long)]
    enable_tail_call: bool,
    #[arg(long)]
    enable_bulk_memory: bool,
    #[arg(long)]
    enable_reference_types: bool,
    #[arg(long)]
    enable_exceptions: bool,
    #[arg(long)]
    enable_function_references: bool,
    #[arg(long)]
    enable_gc: bool,
}

impl FeatureFlags {
    fn to_features(&self) -> Features {
        let pairs = [
            (self.enable_mutable_globals, Feature::MutableGlobals),
            (
                self.enable_saturating_float_to_int,
                Feature::SaturatingFloatToInt,
            ),
            (self.enable_sign_extension, Feature::SignExtension),
            (self.enable_simd, Feature::Simd),
            (self.enable_threads, Feature::Threads),
            (self.enable_multi_value, Feature::MultiValue),
            (self.enable_tail_call, Feature::TailCall),
            (self.enable_bulk_memory, Feature::BulkMemory),
            (self.enable_reference_types, Feature::ReferenceTypes),
            (self.enable_exceptions, Feature::Exceptions),
            (self.enable_function_references, Feature::FunctionReferences),
            (self.enable_gc, Feature::Gc),
        ];
        let mut features = Features::mvp();
        for (enabled, feature) in pairs {
            if enabled {
                features = features.enable(feature);
            }
        }
        features
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            files,
            headers,
            disassemble,
            details,
            full_contents,
            section,
        } => {
            if !(headers || disassemble || details || full_contents) {
                eprintln!("At least one of the following switches must be given:");
                eprintln!(" -d/--disassemble");
                eprintln!(" -h/--headers");
                eprintln!(" -x/--details");
                eprintln!(" -s/--full-contents");
                return ExitCode::FAILURE;
            }
            let options = dump::Options {
                headers,
                details,
                disassemble,
                raw: full_contents,
                section,
            };
            run_dump(&files, &options)
        }
        Commands::Validate {
            files,
            verbose,
            features,
        } => {
            let options = validate::Options {
                verbose,
                features: features.to_features(),
            };
            run_validate(&files, &options)
        }
    }
}

fn run_dump(files: &[String], options: &dump::Options) -> ExitCode {
    let mut ok = true;
    for file in files {
        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Error reading {}: {}", file, e);
                ok = false;
                continue;
            }
        };
        let (report, errors) = dump::dump(file, &bytes, options);
        print!("{}", report);
        for diagnostic in errors.diagnostics() {
            eprint!(
                "{}",
                wasmlens::tools::render_diagnostic(file, &bytes, &diagnostic)
            );
        }
    }
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_validate(files: &[String], options: &validate::Options) -> ExitCode {
    let mut ok = true;
    for file in files {
        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Error reading {}: {}", file, e);
                ok = false;
                continue;
            }
        };
        let outcome = validate::validate(file, &bytes, options);
        print!("{}", outcome.report);
        ok &= outcome.valid;
    }
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
