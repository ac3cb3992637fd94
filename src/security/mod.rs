pub mod country_block;
pub mod gate;
pub mod password;
