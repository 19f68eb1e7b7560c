mod creator;
mod policy;
mod refund;
mod token;

pub use creator::*;
pub use policy::*;
pub use refund::*;
pub use token::*;
