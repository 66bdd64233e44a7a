mod address;
pub use address::*;

mod error;
pub use error::*;

mod value;
pub use value::*;

mod interface;
pub use interface::*;

mod scatter;
pub use scatter::*;

mod image;
pub use image::*;
