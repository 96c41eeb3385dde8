pub mod outcome;
pub mod persona;
pub mod response;

pub use outcome::OutcomeRecord;
pub use persona::{Demographics, PersonaProfile};
pub use response::{Reaction, ResponseRecord};
