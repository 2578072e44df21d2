pub mod car;
pub mod contact;

pub use car::{Car, CarChanges, CarFilter, CarFilterQuery, NewCar};
pub use contact::{CarSummary, Contact, ContactChanges, ContactView, NewContact};
