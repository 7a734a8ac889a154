//! Data models for Perpustakaan

pub mod category;
pub mod item;
pub mod loan;
pub mod review;
pub mod user;

// Re-export commonly used types
pub use category::Category;
pub use item::{Item, ItemShort};
pub use loan::{Loan, LoanDetails, LoanStatus};
pub use review::Review;
pub use user::{Role, User, UserClaims};
