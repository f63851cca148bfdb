//! Email provider implementations.
//!
//! Each provider implements the [`Mailer`](crate::Mailer) trait.
//!
//! ## Available Providers
//!
//! | Provider | `NOTIFIER_MAILER` | Description |
//! |----------|-------------------|-------------|
//! | [`SendGridMailer`] | `sendgrid` | SendGrid v3 API |
//! | [`LoggerMailer`] | `logger` | Logs emails without sending |
//! | [`LocalMailer`] | (tests) | In-memory capture for assertions |

mod local;
mod logger;
mod sendgrid;

pub use local::{LocalMailer, StoredEmail};
pub use logger::LoggerMailer;
pub use sendgrid::{SendGridMailer, SENDGRID_API_URL};
