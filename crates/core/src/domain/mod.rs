pub mod capability;
pub mod review;
