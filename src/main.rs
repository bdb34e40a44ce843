use std::path::PathBuf;
use std::process;

use anyhow::{Context, Error, Result};
use log::*;

use triangle_engine::{Engine, RenderError, RendererConfig};

fn run() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = RendererConfig::load(config_path.as_deref()).context("loading configuration")?;

    let engine = Engine::new(&config).context("initializing renderer")?;
    let frames = engine.run().context("running frame loop")?;

    info!("Rendered {} frames.", frames);
    Ok(())
}

/// The single line printed for a fatal error, and the process exit code.
fn report(err: &Error) -> (String, i32) {
    match err.downcast_ref::<RenderError>() {
        Some(render_error) => (render_error.diagnostic(), render_error.exit_code()),
        None => (format!("(!) error: {:#}", err), 1),
    }
}

fn main() {
    pretty_env_logger::init();

    if let Err(err) = run() {
        let (message, code) = report(&err);
        eprintln!("{}", message);
        process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triangle_engine::ErrorKind;

    #[test]
    fn render_error_is_reported_once_with_its_exit_code() {
        let err = Error::new(RenderError::new(
            ErrorKind::Synchronization,
            "queue present",
            "device lost",
        ))
        .context("running frame loop");

        let (message, code) = report(&err);

        assert_eq!(code, 4);
        assert!(message.starts_with("(!) error at "));
        assert_eq!(message.lines().count(), 1);
        assert_eq!(message.matches("queue present failed").count(), 1);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err = anyhow::anyhow!("no display").context("initializing renderer");

        let (message, code) = report(&err);

        assert_eq!(code, 1);
        assert!(message.contains("no display"));
    }
}
