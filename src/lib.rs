//! Automation for unattended coding sessions on CI.
//!
//! Two tools share this crate:
//!
//! - `verify-ci`, a Claude Code Stop hook that re-runs the project's checks
//!   and blocks the session from finishing while they fail, up to a retry cap.
//! - `track-ci-failures`, which records repeated workflow failures on a pull
//!   request in a single tracker comment and escalates with a label once every
//!   failing workflow has used up its attempts.

pub mod exec;
pub mod logging;
pub mod stop;
pub mod testing;
pub mod tracker;
