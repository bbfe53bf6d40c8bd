mod delivery;
mod emailjs;

pub use delivery::{Mailer, SimulatedMailer};
pub use emailjs::{EmailJsClient, EmailJsConfig};
