use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// binaries log under their own crate name
static DEFAULT_DIRECTIVES: &str = "warn,genosurv=info,sanitize_metadata=info,case_matrix=info,period_metrics=info,merge_covariates=info,run_pipeline=info";


/// Installs the console subscriber for the binaries; `RUST_LOG` overrides
/// the default filter. Records emitted through `log` are forwarded by the
/// subscriber's log bridge.
pub fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}
