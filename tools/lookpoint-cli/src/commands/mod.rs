pub mod calibrate;
pub mod check;
pub mod info;
pub mod replay;
