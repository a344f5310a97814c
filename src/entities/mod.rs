pub mod cash_balance;
pub mod cash_transaction;
pub mod delivery_note;
pub mod driver;
pub mod material;
pub mod route;
pub mod truck;
pub mod user;

pub use cash_transaction::{TransactionCategory, TransactionType};
pub use delivery_note::DeliveryNoteStatus;
pub use user::UserRole;
