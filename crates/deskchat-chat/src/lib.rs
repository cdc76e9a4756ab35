// Chat module - utterance dispatch and outcome recording
pub mod dispatcher;
pub mod order_number;

pub use dispatcher::{Dispatcher, Notice, PendingRequest};
pub use order_number::extract_order_number;
