use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::panic::Location;
use std::path::Path;

use thiserror::Error;
use vulkanalia::vk;

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Broad class of a failure. Each class maps to exactly one process exit code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing GPU, queue family, extension or format.
    Environment,
    /// An API object could not be created, allocated or bound.
    Resource,
    /// Acquire, wait, submit or present failed in the frame loop.
    Synchronization,
    /// Shader or configuration file could not be read.
    Io,
    /// Configuration could not be parsed or is invalid.
    Config,
}

impl ErrorKind {
    pub const fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Environment => 2,
            ErrorKind::Resource => 3,
            ErrorKind::Synchronization => 4,
            ErrorKind::Io => 5,
            ErrorKind::Config => 6,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Environment => "environment",
            ErrorKind::Resource => "resource",
            ErrorKind::Synchronization => "synchronization",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// A fatal renderer error.
///
/// Every error records the stage that failed, the Vulkan result code when
/// there is one, and the source location it was raised from.
#[derive(Debug, Error)]
#[error("{stage} failed ({kind} error): {detail}")]
pub struct RenderError {
    kind: ErrorKind,
    stage: &'static str,
    detail: String,
    code: Option<i32>,
    location: &'static Location<'static>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl RenderError {
    #[track_caller]
    pub fn new(kind: ErrorKind, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            detail: detail.into(),
            code: None,
            location: Location::caller(),
            source: None,
        }
    }

    #[track_caller]
    pub fn vulkan(kind: ErrorKind, stage: &'static str, result: vk::Result) -> Self {
        Self {
            code: Some(result.as_raw()),
            ..Self::new(kind, stage, format!("{:?}", result))
        }
    }

    #[track_caller]
    pub fn io(stage: &'static str, path: &Path, err: io::Error) -> Self {
        Self::new(ErrorKind::Io, stage, format!("`{}`: {}", path.display(), err)).with_source(err)
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Raw Vulkan result code, if the failure came from an API call.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// The one-line report printed before the process terminates.
    pub fn diagnostic(&self) -> String {
        let code = match self.code {
            Some(code) => format!(" [{}]", code),
            None => String::new(),
        };

        format!(
            "(!) error at {}:{}: {} failed{}: {}",
            self.location.file(),
            self.location.line(),
            self.stage,
            code,
            self.detail
        )
    }
}

/// Attaches an error kind and stage name to a raw Vulkan result.
pub trait VkResultExt<T> {
    fn or_fail(self, kind: ErrorKind, stage: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::ErrorCode> {
    #[track_caller]
    fn or_fail(self, kind: ErrorKind, stage: &'static str) -> Result<T> {
        let location = Location::caller();
        self.map_err(|code| RenderError {
            location,
            ..RenderError::vulkan(kind, stage, vk::Result::from_raw(code.as_raw()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::Environment,
            ErrorKind::Resource,
            ErrorKind::Synchronization,
            ErrorKind::Io,
            ErrorKind::Config,
        ];

        let mut codes = kinds.iter().map(|k| k.exit_code()).collect::<Vec<_>>();
        assert!(codes.iter().all(|c| *c != 0 && *c != 1));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn vulkan_error_carries_code_and_stage() {
        let err = RenderError::vulkan(
            ErrorKind::Resource,
            "create render pass",
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
        );

        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(err.stage(), "create render pass");
        assert_eq!(err.code(), Some(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY.as_raw()));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn diagnostic_names_line_stage_and_code() {
        let line = line!() + 1;
        let err = RenderError::vulkan(ErrorKind::Synchronization, "queue submit", vk::Result::ERROR_DEVICE_LOST);
        let text = err.diagnostic();

        assert!(text.starts_with("(!) error at "));
        assert!(text.contains(&format!("error.rs:{}:", line)));
        assert!(text.contains("queue submit failed"));
        assert!(text.contains(&format!("[{}]", vk::Result::ERROR_DEVICE_LOST.as_raw())));
    }

    #[test]
    fn or_fail_reports_the_calling_line() {
        let failed: std::result::Result<(), vk::ErrorCode> =
            Err(vk::ErrorCode::from_raw(vk::Result::ERROR_INITIALIZATION_FAILED.as_raw()));

        let line = line!() + 1;
        let err = failed.or_fail(ErrorKind::Environment, "create instance").unwrap_err();

        assert_eq!(err.location().line(), line);
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert_eq!(err.code(), Some(vk::Result::ERROR_INITIALIZATION_FAILED.as_raw()));
    }

    #[test]
    fn io_error_keeps_source() {
        let err = RenderError::io(
            "load shader",
            Path::new("missing.spv"),
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.code().is_none());
        assert!(StdError::source(&err).is_some());
        assert!(err.to_string().contains("missing.spv"));
    }
}
