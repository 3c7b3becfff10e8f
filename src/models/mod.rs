pub mod enums;
pub mod envelope;
pub mod recipe;
pub mod workout;

pub use enums::*;
pub use envelope::*;
pub use recipe::*;
pub use workout::*;
