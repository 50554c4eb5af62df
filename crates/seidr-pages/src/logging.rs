//! Logging abstraction layer for seidr-pages
//!
//! Thin macros over [`tracing`] so that call sites stay short and the
//! rendering code never names the logging backend directly. Events are
//! emitted under the `seidr_pages` target; install any `tracing` subscriber
//! to see them.
//!
//! ## Macro Overview
//!
//! | Macro | Feature Required | Level |
//! |-------|------------------|-------|
//! | `debug_log!` | `debug-hooks` | `DEBUG` |
//! | `info_log!` | None | `INFO` |
//! | `warn_log!` | None | `WARN` |
//! | `error_log!` | None | `ERROR` |
//!
//! ## Example
//!
//! ```ignore
//! use seidr_pages::{debug_log, info_log, warn_log, error_log};
//!
//! // Only emitted when the `debug-hooks` feature is enabled
//! debug_log!("registry size: {}", registry.len());
//!
//! info_log!("Component hydrated");
//! warn_log!("binding for element {} skipped", id);
//! error_log!("render failed: {}", error);
//! ```

/// Logs a debug message (requires the `debug-hooks` feature)
///
/// Used for tracing registrations and replay steps. Compiles to a no-op
/// (arguments are not evaluated) when the feature is disabled.
#[macro_export]
#[cfg(feature = "debug-hooks")]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__tracing::debug!(target: "seidr_pages", $($arg)*);
	}};
}

/// No-op debug_log when the `debug-hooks` feature is disabled
#[macro_export]
#[cfg(not(feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message
///
/// # Example
///
/// ```ignore
/// info_log!("rendered {} bytes", html.len());
/// ```
#[macro_export]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__tracing::info!(target: "seidr_pages", $($arg)*);
	}};
}

/// Logs a warning message
///
/// Recoverable hydration problems are reported through this macro.
#[macro_export]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__tracing::warn!(target: "seidr_pages", $($arg)*);
	}};
}

/// Logs an error message
#[macro_export]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__tracing::error!(target: "seidr_pages", $($arg)*);
	}};
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	// Import macros from crate root
	use crate::{debug_log, error_log, info_log, warn_log};

	#[rstest]
	fn test_logging_macros_compile() {
		debug_log!("Debug message: {}", 42);
		info_log!("Info message: {}", "test");
		warn_log!("Warning message: {:?}", vec![1, 2, 3]);
		error_log!("Error message: {}", "error");
	}

	#[rstest]
	fn test_logging_macros_with_subscriber() {
		let subscriber = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::TRACE)
			.with_test_writer()
			.finish();
		tracing::subscriber::with_default(subscriber, || {
			info_log!("Simple info");
			warn_log!("Simple warning");
			error_log!("Simple error");
		});
	}
}
