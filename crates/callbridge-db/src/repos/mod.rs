//! Repositories - one per table

mod apps;
mod bindings;
mod calls;
mod events;
mod key_audit;
mod messages;
mod registrations;
mod user_mappings;
mod voicemails;

pub use apps::AppRepo;
pub use bindings::BindingRepo;
pub use calls::{CallRepo, NewCall};
pub use events::EventRepo;
pub use key_audit::KeyAuditRepo;
pub use messages::{MessageRepo, NewMessage};
pub use registrations::{NewRegistration, RegistrationRepo};
pub use user_mappings::UserMappingRepo;
pub use voicemails::{NewVoicemail, VoicemailRepo};
