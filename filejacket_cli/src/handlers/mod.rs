pub mod hash;
pub mod inspect;
pub mod rename;
pub mod serialize;
pub mod unpack;
