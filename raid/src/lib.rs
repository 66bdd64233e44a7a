mod error;
pub use error::*;

mod sync;

mod cancel;
pub use cancel::*;

mod settings;
pub use settings::*;

mod managed;
pub use managed::*;

mod transform;
pub use transform::*;

mod skeleton;
pub use skeleton::*;

mod entity;
pub use entity::*;

mod activity;
pub use activity::*;

mod session;
pub use session::*;

mod watchlist;
pub use watchlist::*;

mod wishlist;
pub use wishlist::*;

mod snapshot;
pub use snapshot::*;

mod radar;
pub use radar::*;

#[cfg(test)]
mod test_support;
