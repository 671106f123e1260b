//! ARIB STD-B24で規定される8単位符号。

pub mod char;
pub mod control;
pub mod decode;
pub mod table;
