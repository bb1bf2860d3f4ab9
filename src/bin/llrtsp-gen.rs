//! Command-line interface for the llrtsp generator
//!
//! Usage:
//!   llrtsp-gen generate [--config `<file>`] [--out-dir `<dir>`] [--set key=value]...
//!   llrtsp-gen dump `<strict|loose>` [--header]
//!
//! `LLPARSE_DEBUG` set to a non-empty value turns on debug tracing in the
//! emitted parser, like `--debug`.

use clap::{Arg, ArgAction, ArgMatches, Command};
use llrtsp::build::DualBuild;
use llrtsp::compiler::CCompiler;
use llrtsp::config::{GeneratorConfig, Loader};
use llrtsp::rtsp;
use llrtsp::{GenerateError, Generator, Variant};
use log::{error, warn};

fn main() {
    let matches = Command::new("llrtsp-gen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate the llrtsp C parser and header")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log debug output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("generate")
                .about("Compile both variants and write llrtsp.c and llrtsp.h")
                .args(config_args())
                .arg(
                    Arg::new("manifest")
                        .long("manifest")
                        .help("Package descriptor holding the version (Cargo.toml or package.json)"),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .short('o')
                        .help("Directory receiving c/llrtsp.c and llrtsp.h"),
                ),
        )
        .subcommand(
            Command::new("dump")
                .about("Print the compiler output for one variant")
                .args(config_args())
                .arg(
                    Arg::new("variant")
                        .help("Variant to compile")
                        .required(true)
                        .value_parser(["strict", "loose"])
                        .index(1),
                )
                .arg(
                    Arg::new("header")
                        .long("header")
                        .help("Print the header fragment instead of the C body")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let result = match matches.subcommand() {
        Some(("generate", sub)) => handle_generate_command(sub),
        Some(("dump", sub)) => handle_dump_command(sub),
        _ => Ok(()),
    };

    if let Err(e) = result {
        error!("{} stage failed", e.stage());
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Arguments shared by every subcommand that loads configuration.
fn config_args() -> Vec<Arg> {
    vec![
        Arg::new("config")
            .long("config")
            .short('c')
            .help("TOML file layered over the built-in defaults"),
        Arg::new("set")
            .long("set")
            .help("Override one configuration key, e.g. compiler.debug=true")
            .value_name("KEY=VALUE")
            .value_parser(parse_key_value)
            .action(ArgAction::Append),
        Arg::new("debug")
            .long("debug")
            .help("Emit calls to the debug hook from the generated parser")
            .action(ArgAction::SetTrue),
        Arg::new("loose-as-strict")
            .long("loose-as-strict")
            .help("Build the loose slot from the strict grammar")
            .action(ArgAction::SetTrue),
    ]
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn load_config(matches: &ArgMatches) -> Result<GeneratorConfig, GenerateError> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }

    let env_debug = std::env::var("LLPARSE_DEBUG")
        .map(|v| !v.is_empty())
        .unwrap_or(false);
    if env_debug || matches.get_flag("debug") {
        loader = loader.set_override("compiler.debug", true)?;
    }
    if matches.get_flag("loose-as-strict") {
        loader = loader.set_override("variants.loose", "strict")?;
    }
    if let Ok(Some(manifest)) = matches.try_get_one::<String>("manifest") {
        loader = loader.set_override("package.manifest", manifest.as_str())?;
    }
    if let Ok(Some(dir)) = matches.try_get_one::<String>("out-dir") {
        loader = loader.set_override("output.dir", dir.as_str())?;
    }
    if let Some(pairs) = matches.get_many::<(String, String)>("set") {
        for (key, value) in pairs {
            loader = loader.set_override(key, value.as_str())?;
        }
    }

    Ok(loader.build()?)
}

fn handle_generate_command(matches: &ArgMatches) -> Result<(), GenerateError> {
    let config = load_config(matches)?;
    let report = Generator::new(CCompiler::new(), config).generate_from_manifest()?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("could not serialize report: {}", e),
    }
    Ok(())
}

fn handle_dump_command(matches: &ArgMatches) -> Result<(), GenerateError> {
    let config = load_config(matches)?;
    let variant = match matches.get_one::<String>("variant").map(String::as_str) {
        Some("loose") => Variant::Loose,
        _ => Variant::Strict,
    };

    let compiler = CCompiler::new();
    let options = config.compile_options();
    let prefix = config.compiler.prefix.as_str();
    let artifact = DualBuild::new(&compiler, &options)
        .with_binding(config.variants)
        .compile(variant, &|mode| rtsp::grammar(prefix, mode))?;

    if matches.get_flag("header") {
        print!("{}", artifact.header);
    } else {
        print!("{}", artifact.c.unwrap_or_default());
    }
    Ok(())
}
