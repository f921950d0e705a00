pub mod cookie;
pub mod feed;
pub mod keyword;
pub mod reminder;
pub mod setting;

pub use cookie::*;
pub use feed::*;
pub use keyword::*;
pub use reminder::*;
pub use setting::*;
