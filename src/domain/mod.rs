//! Domain records shared by every stage of the pipeline

pub mod alert;
pub mod country;
pub mod measurement;
pub mod policy;
pub mod proposal;

pub use alert::*;
pub use country::*;
pub use measurement::*;
pub use policy::*;
pub use proposal::*;
