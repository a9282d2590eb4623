pub use capabilities::*;

mod capabilities;
