//! Domain models.
//!
//! These are the types repositories return and services accept. Wire names
//! match the JSON API (`price_vnd`, `book_title`, ...).

pub mod book;
pub mod cart;
pub mod category;
pub mod order;
pub mod user;

pub use book::{Book, BookInput, BookListing, BookQuery, BookSort, SearchResults};
pub use cart::{CartLine, CartSummary, CartView};
pub use category::{Category, CategoryInput};
pub use order::{CustomerInfo, Order, OrderDetail, OrderLine, OrderReceipt};
pub use user::{User, UserUpdate};
