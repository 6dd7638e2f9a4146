//! Small helpers shared by domain consumers

pub mod text;
