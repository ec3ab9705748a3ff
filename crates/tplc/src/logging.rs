use anyhow::anyhow;
use anyhow::Result;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::args::GlobalArgs;

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-q` shows errors only, the default
/// shows warnings, `-v` adds session summaries and `-vv` everything the
/// compiler traces.
pub fn init(args: &GlobalArgs) -> Result<()> {
    let level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install the logger: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_reported() {
        let args = GlobalArgs {
            quiet: false,
            verbose: 0,
        };
        // the first call may race other tests for the global slot
        let _ = init(&args);
        let err = init(&args).unwrap_err();
        assert!(err.to_string().starts_with("failed to install the logger"));
    }
}
