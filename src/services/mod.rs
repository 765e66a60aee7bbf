pub mod captcha;
pub mod droid;
pub mod error;
pub mod results;
pub mod search;

pub use captcha::*;
pub use droid::*;
pub use error::*;
pub use results::*;
pub use search::*;
