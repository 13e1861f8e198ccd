pub mod certificate;
pub mod check;
pub mod codec;
pub mod constants;
pub mod error;
pub mod note;
pub mod types;

pub use certificate::DeviceCertificate;
pub use check::Check;
pub use codec::{Decode, Encode};
pub use constants::*;
pub use error::{NoteDefect, ScripError, Signer};
pub use note::{PromissoryNote, PromissoryNoteDraft};
pub use types::{BankId, Money, Serial};
