mod constructor;
mod descriptor;
mod dispose;
mod fallible;
mod func;
mod interface;
mod service;

pub use constructor::*;
pub use descriptor::*;
pub use dispose::*;
pub use fallible::*;
pub use func::*;
pub use interface::*;
pub use service::*;

pub(crate) use descriptor::Provision;
pub(crate) use dispose::dispose_all;
pub(crate) use service::{erase, unerase};
