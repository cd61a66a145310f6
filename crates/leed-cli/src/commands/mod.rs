pub mod beams;
pub mod rfactor;
pub mod run;
pub mod validate;
