/*!

# Overview

The `log` module provides logging with a numeric verbosity threshold on top of `tracing`. The log level describes
what _kind_ of message is logged (critical, error, warning, info, debug, trace), and the threshold describes how
_verbose_ the message is. A message is emitted only if its threshold is at most the global threshold.

```
use casgraph::log::*;

set_global_logging_threshold(1);

warning!("Always emitted: threshold defaults to 0.");
info!(1, "Emitted: 1 <= 1.");
debug!(4, "Not emitted: 4 > 1.");
```

## Threshold

The global threshold is a process-wide atomic, so it can be changed at any time from any thread:

```
use casgraph::log::{set_global_logging_threshold, get_global_logging_threshold};

set_global_logging_threshold(3);
assert_eq!(get_global_logging_threshold(), 3);
```

Within this crate the thresholds are used roughly as follows:

| threshold | used for                                                              |
|:----------|:----------------------------------------------------------------------|
| 0         | anomalies the caller should always hear about (pool misuse)           |
| 1         | schema problems that are recovered from (unresolved merge remainders) |
| 2         | merge events, reinitialization during load                            |
| 3         | swallowed feature redeclarations, format detection                    |
| 4+        | per-record tracing in codecs and the copier                           |

# Macros

`critical!`, `error!`, `warning!`, `info!`, `debug!`, `trace!`, each accepting either
`level!(threshold, "format", args...)` or `level!("format", args...)` (threshold 0). The threshold is an integer
literal.

# Subscriber

The first macro invocation installs a `tracing_subscriber::Registry` with the threshold filter and a compact field
formatter writing to stdout. If the host application has already installed a global subscriber, ours is not
installed and events flow to theirs (filtered by their rules, not ours).

*/
mod formatter;
mod threshold_filter;
mod macros;

use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::Lazy;
use tracing_subscriber::{
  fmt,
  layer::SubscriberExt,
  Registry
};

use threshold_filter::ThresholdFilterLayer;
use formatter::CompactFieldFormatter;
pub use macros::*;

/// Used for implicit initialization. Holds whether our subscriber became the global default.
static INIT_LOGGER: Lazy<bool> = Lazy::new(|| {
  let subscriber = Registry::default()
      .with(ThresholdFilterLayer)
      .with(
        fmt::layer()
            .fmt_fields(CompactFieldFormatter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stdout),
      );

  tracing::subscriber::set_global_default(subscriber).is_ok()
});

/// This does not need to be called directly. Initializes the logging system.
pub fn init_logger() {
  Lazy::force(&INIT_LOGGER);
}

/// Whether the crate's own subscriber is the global default.
pub fn owns_global_subscriber() -> bool {
  *Lazy::force(&INIT_LOGGER)
}

static GLOBAL_LOGGING_THRESHOLD: AtomicU8 = AtomicU8::new(2); // Default threshold

/// Sets the global threshold. Takes effect immediately for subsequent events.
pub fn set_global_logging_threshold(new_threshold: u8) {
  GLOBAL_LOGGING_THRESHOLD.store(new_threshold, Ordering::SeqCst);
}

/// Retrieves the global threshold.
pub fn get_global_logging_threshold() -> u8 {
  GLOBAL_LOGGING_THRESHOLD.load(Ordering::SeqCst)
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_round_trip() {
    let previous = get_global_logging_threshold();
    set_global_logging_threshold(5);
    assert_eq!(get_global_logging_threshold(), 5);
    set_global_logging_threshold(previous);
  }

  #[test]
  fn macros_accept_both_forms() {
    let type_name = "org.example.Token";
    info!(2, "merged type {}", type_name);
    debug!(9, "NOT logged {:?}", type_name);
    warning!("no threshold given for {}", type_name);
    warning!("store {} released twice ({} free)", 7, 3);
    info!("plain message");
    trace!(4, "inline {type_name}");
    critical!(1, "critical: {}", type_name);
    // Initialization is idempotent.
    init_logger();
    init_logger();
  }
}
