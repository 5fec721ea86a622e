//! Command-line boundary: one JSON argument in, one JSON line out.
//!
//! Every failure, panics included, is turned into an error payload here so
//! the caller always has exactly one line of JSON to parse.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::ffi::OsString;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use crate::common::config::{AppCfg, Overrides, DEFAULT_LOG_LEVEL};
use crate::common::error::{PredictError, PredictResult};
use crate::common::log;
use crate::features::domain::{FeatureVector, SchemaVersion};
use crate::inference::domain::{ErrorPayload, Prediction, PredictionResult};
use crate::inference::service::Predictor;
use crate::model::repo_fs::FsModelRepo;

/// Message returned when the request argument is absent.
pub const NO_INPUT: &str = "No input data provided to the predictor.";

#[derive(Debug, Parser)]
#[command(
    name = "crop-health-predict",
    version,
    about = "Predict crop health for one JSON feature vector"
)]
struct Cli {
    /// Feature vector as a JSON object, e.g. '{"NDVI": 0.5, ...}'.
    input: Option<String>,

    /// Feature schema generation the model was trained with.
    #[arg(long, value_name = "v1|v2", value_parser = parse_schema)]
    schema: Option<SchemaVersion>,

    /// Model artefact (defaults to crop_health_model.json next to the executable).
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Versioned label file (defaults to crop_health_labels.json next to the executable, if present).
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Diagnostics filter for stderr, e.g. "debug".
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn parse_schema(value: &str) -> Result<SchemaVersion, String> {
    value.parse()
}

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Replace the default panic hook so nothing is written to stderr; the
/// location and backtrace are kept for the error payload instead.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let trace = format!("{info}\n{}", Backtrace::force_capture());
        LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(trace));
    }));
}

/// Run one invocation and return the text to print on stdout.
pub fn run<I, T>(args: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    err.render().to_string().trim_end().to_string()
                }
                _ => PredictionResult::Failure(ErrorPayload {
                    error: "Invalid arguments".to_string(),
                    details: Some(err.render().to_string().trim_end().to_string()),
                    traceback: None,
                })
                .to_json_line(),
            };
        }
    };

    log::init(cli.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL));

    let Some(input) = cli.input.clone() else {
        return PredictionResult::Failure(ErrorPayload::message(NO_INPUT)).to_json_line();
    };

    let result = match panic::catch_unwind(AssertUnwindSafe(|| execute(cli, &input))) {
        Ok(result) => result,
        Err(payload) => Err(panic_error(payload)),
    };

    match &result {
        Ok(prediction) => info!(
            class_id = prediction.class_id,
            label = %prediction.prediction,
            "prediction ok"
        ),
        Err(err) => error!(kind = err.kind().as_str(), error = %err, "prediction failed"),
    }

    PredictionResult::from(result).to_json_line()
}

fn execute(cli: Cli, input: &str) -> PredictResult<Prediction> {
    let request = FeatureVector::from_json(input)?;
    let cfg = AppCfg::load(Overrides {
        model_path: cli.model,
        labels_path: cli.labels,
        schema: cli.schema,
    })?;

    let repo = FsModelRepo::new(&cfg);
    let predictor = Predictor::load(&repo, cfg.schema)?;
    predictor.predict(request)
}

fn panic_error(payload: Box<dyn Any + Send>) -> PredictError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    let trace = LAST_PANIC.with(|slot| slot.borrow_mut().take());
    PredictError::unexpected_with(
        format!("Unexpected failure: {message}"),
        Some(message),
        trace,
    )
}
