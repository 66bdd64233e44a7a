mod kind;
pub use kind::*;

mod player;
pub use player::*;

mod gear;
pub use gear::*;
