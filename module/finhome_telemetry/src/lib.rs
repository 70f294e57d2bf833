//! Centralized logging and tracing abstraction
//!
//! Provides unified structured logging across the finhome crates:
//! - Structured logging with `tracing`
//! - Log level configuration at startup
//! - Domain event helpers (budget threshold crossings, renewal outcomes)

#![cfg_attr(not(feature = "enabled"), allow(unused_variables, dead_code))]

#[cfg(feature = "enabled")]
mod implementation
{
  use tracing::level_filters::LevelFilter;

  /// Log level configuration
  #[derive(Debug, Clone, Copy)]
  pub enum LogLevel
  {
    Debug,
    Info,
    Warn,
    Error,
  }

  impl From<LogLevel> for LevelFilter
  {
    fn from(level: LogLevel) -> Self
    {
      match level
      {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
      }
    }
  }

  /// Initialize logging infrastructure
  ///
  /// Sets up tracing subscriber with specified log level.
  /// Call this once at application startup.
  pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error>>
  {
    use tracing_subscriber::FmtSubscriber;

    let subscriber = FmtSubscriber::builder()
      .with_max_level(level)
      .with_target(false)
      .with_thread_ids(true)
      .with_line_number(true)
      .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
  }

  /// Log a budget crossing a watched threshold (near-limit or over).
  pub fn log_budget_threshold(owner_id: i64, category_id: i64, consumed: &str, cap: &str, state: &str)
  {
    tracing::warn!(
      owner_id = owner_id,
      category_id = category_id,
      consumed = %consumed,
      cap = %cap,
      state = %state,
      "budget threshold crossed"
    );
  }

  /// Log a renewal scheduler outcome for a single budget row.
  pub fn log_renewal_outcome(budget_id: i64, renewed: bool, error: Option<&str>)
  {
    match error
    {
      Some(e) => tracing::error!(budget_id = budget_id, renewed = renewed, error = %e, "renewal failed"),
      None => tracing::info!(budget_id = budget_id, renewed = renewed, "renewal processed"),
    }
  }

  /// Log a projection execution.
  pub fn log_projection_executed(projection_id: i64, owner_id: i64, entry_id: i64)
  {
    tracing::info!(
      projection_id = projection_id,
      owner_id = owner_id,
      entry_id = entry_id,
      "projection executed"
    );
  }
}

#[cfg(feature = "enabled")]
pub use implementation::*;

#[cfg(not(feature = "enabled"))]
mod stub
{
  /// Stub log level for disabled feature
  #[derive(Debug, Clone, Copy)]
  pub enum LogLevel
  {
    Debug,
    Info,
    Warn,
    Error,
  }

  /// Stub init function
  pub fn init_logging(_level: LogLevel) -> Result<(), Box<dyn std::error::Error>>
  {
    Ok(())
  }

  /// Stub log function
  pub fn log_budget_threshold(_owner_id: i64, _category_id: i64, _consumed: &str, _cap: &str, _state: &str) {}

  /// Stub log function
  pub fn log_renewal_outcome(_budget_id: i64, _renewed: bool, _error: Option<&str>) {}

  /// Stub log function
  pub fn log_projection_executed(_projection_id: i64, _owner_id: i64, _entry_id: i64) {}
}

#[cfg(not(feature = "enabled"))]
pub use stub::*;
