pub mod controller;
pub mod dispatch;
pub mod output;
pub mod validate;
pub mod worker;
