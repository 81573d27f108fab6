pub mod domain;
pub mod error;

pub use domain::{
    Field, FormProfile, FormState, OptionEntry, ProfileKind, Registration, SubjectMode,
    PHONE_PREFIX,
};
pub use error::FormError;
