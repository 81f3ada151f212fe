use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use exoplanet_cli::open_service;
use exoplanet_cli::train::input::TrainConfig;
use exoplanet_cli::train::trainer;
use exoplanet_cli::{inspect, predict};

const DEFAULT_MODEL_DIR: &str = "models";

fn model_dir_arg() -> Arg {
    Arg::new("model_dir")
        .long("model-dir")
        .help("Directory holding exoplanet_model.json and data_processor.json")
        .value_parser(clap::builder::NonEmptyStringValueParser::new())
        .value_hint(ValueHint::DirPath)
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("EXOPLANET_LOG", "error,exoplanet=info"))
        .init();

    let matches = Command::new("exoplanet")
        .version(clap::crate_version!())
        .about("\u{1FA90} Exoplanet CLI - KOI disposition classifier")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train the classifier and save its artifacts")
                .arg(
                    Arg::new("config")
                        .help("Path to training configuration file. Defaults are printed when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('d')
                        .long("train_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to a KOI table (*.csv or *.tsv). Overrides the training data \
                             file specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("synthetic")
                        .long("synthetic")
                        .help("Train on the synthetic KOI sample instead of a file.")
                        .conflicts_with("train_data")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("model_type")
                        .short('m')
                        .long("model-type")
                        .help(
                            "Model to train. \
                             Overrides the model type specified in the configuration file.",
                        )
                        .value_parser(["ensemble", "random_forest", "gradient_boosting"])
                        .required(false),
                )
                .arg(model_dir_arg())
                .arg(
                    Arg::new("set")
                        .long("set")
                        .help("Override one hyperparameter, e.g. --set rf_n_estimators=200")
                        .value_name("NAME=VALUE")
                        .action(ArgAction::Append)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Classify KOI records with a trained model")
                .arg(
                    Arg::new("input")
                        .help("Records to classify (*.csv, *.tsv or *.json)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to the output file for predictions (*.tsv or *.csv). Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(model_dir_arg()),
        )
        .subcommand(
            Command::new("metrics")
                .about("Print the metrics and feature ranking of the saved model")
                .arg(model_dir_arg()),
        )
        .subcommand(
            Command::new("hyperparams")
                .about("Print the hyperparameters of the saved model")
                .arg(model_dir_arg()),
        )
        .subcommand(Command::new("features").about("List the model's input features"))
        .subcommand(
            Command::new("sample")
                .about("Print synthetic sample records as JSON")
                .arg(
                    Arg::new("n")
                        .short('n')
                        .long("n")
                        .help("Number of records")
                        .default_value("5")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("metrics", sub_m)) => {
            open_service(model_dir(sub_m)).and_then(|service| inspect::print_metrics(&service))
        }
        Some(("hyperparams", sub_m)) => open_service(model_dir(sub_m))
            .and_then(|service| inspect::print_hyperparameters(&service)),
        Some(("features", _)) => inspect::print_features(),
        Some(("sample", sub_m)) => {
            let n = sub_m.get_one::<usize>("n").copied().unwrap_or(5);
            inspect::print_sample(n)
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1)
    }
    Ok(())
}

fn model_dir(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("model_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR))
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    match config_path {
        Some(path) => log::info!("[Exoplanet::Train] Training from config: {:?}", path),
        None => log::info!("[Exoplanet::Train] No config provided; using defaults."),
    }

    let params = TrainConfig::from_arguments(config_path, matches)?;
    if config_path.is_none() {
        let default_json = serde_json::to_string_pretty(&params)?;
        eprintln!("[Exoplanet::Train] Default config:\n{}", default_json);
    }

    let metrics = trainer::run_training(&params)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let input: &PathBuf = matches
        .get_one("input")
        .ok_or_else(|| anyhow::anyhow!("input is required"))?;
    let output_file: Option<&PathBuf> = matches.get_one("output_file");
    log::info!("[Exoplanet::Predict] Classifying records from {:?}", input);

    let service = open_service(model_dir(matches))?;
    predict::run_prediction(&service, input, output_file.map(PathBuf::as_path))?;
    Ok(())
}
