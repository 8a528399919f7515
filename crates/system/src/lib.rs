pub mod disks;

pub use disks::*;

pub use protocol::models;
